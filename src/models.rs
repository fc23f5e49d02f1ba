// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Internal Data Models
//!
//! Response shapes served by the internal namespace. These never cross the
//! public wire in the clear; the gateway seals them before they leave.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the people directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Person {
    pub id: u32,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl Person {
    fn new(id: u32, name: &str, email: &str, role: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EchoResponse {
    pub received: Value,
}

/// The static people directory.
pub fn people_directory() -> Vec<Person> {
    vec![
        Person::new(1, "Ada Lovelace", "ada@example.com", "engineer"),
        Person::new(2, "Grace Hopper", "grace@example.com", "admiral"),
        Person::new(3, "Alan Turing", "alan@example.com", "researcher"),
        Person::new(4, "Katherine Johnson", "katherine@example.com", "mathematician"),
    ]
}
