#![allow(dead_code)]

use async_trait::async_trait;
use kospel_cmi::prelude::*;
use std::collections::HashSet;
use std::sync::Mutex;

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn standard_registry() -> Arc<Registry> {
    Arc::new(Registry::standard().unwrap())
}

/// In-memory backend that records every call.
#[derive(Default)]
pub struct MockBackend {
    registers: Mutex<HashMap<String, String>>,
    unreadable: HashSet<String>,
    unwritable: HashSet<String>,
    bulk_read_fails: bool,
    reads: Mutex<Vec<String>>,
    writes: Mutex<Vec<(String, String)>>,
    releases: Mutex<usize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_register(self, register: &str, hex: &str) -> Self {
        self.registers
            .lock()
            .unwrap()
            .insert(register.to_string(), hex.to_string());
        self
    }

    /// `read_register` on this address returns `None`.
    pub fn unreadable(mut self, register: &str) -> Self {
        self.unreadable.insert(register.to_string());
        self
    }

    /// `write_register` on this address returns `false`.
    pub fn unwritable(mut self, register: &str) -> Self {
        self.unwritable.insert(register.to_string());
        self
    }

    /// `read_registers` returns nothing.
    pub fn bulk_read_fails(mut self) -> Self {
        self.bulk_read_fails = true;
        self
    }

    pub fn register(&self, register: &str) -> Option<String> {
        self.registers.lock().unwrap().get(register).cloned()
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn releases(&self) -> usize {
        *self.releases.lock().unwrap()
    }
}

#[async_trait]
impl RegisterBackend for MockBackend {
    async fn read_register(&self, register: &str) -> Option<String> {
        self.reads.lock().unwrap().push(register.to_string());
        if self.unreadable.contains(register) {
            return None;
        }
        Some(
            self.register(register)
                .unwrap_or_else(|| registers::EMPTY_REGISTER.to_string()),
        )
    }

    async fn read_registers(&self, start_register: &str, count: u16) -> HashMap<String, String> {
        if self.bulk_read_fails {
            return HashMap::new();
        }
        let start = reg_address_to_int(start_register).unwrap() as u32;
        let registers = self.registers.lock().unwrap();
        (start..start + count as u32)
            .filter_map(|i| int_to_reg_address(&start_register[..2], i).ok())
            .filter_map(|r| registers.get(&r).map(|hex| (r.clone(), hex.clone())))
            .collect()
    }

    async fn write_register(&self, register: &str, hex_value: &str) -> bool {
        self.writes
            .lock()
            .unwrap()
            .push((register.to_string(), hex_value.to_string()));
        if self.unwritable.contains(register) {
            return false;
        }
        self.registers
            .lock()
            .unwrap()
            .insert(register.to_string(), hex_value.to_string());
        true
    }

    async fn release(&self) {
        *self.releases.lock().unwrap() += 1;
    }
}

pub fn registers_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(r, h)| (r.to_string(), h.to_string()))
        .collect()
}
