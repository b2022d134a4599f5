// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

crate::define_id! {
    /// Test ID type.
    pub struct TestId;
}

#[test]
fn define_id_basics() {
    let id = TestId::new("abc-123");
    assert_eq!(id.as_str(), "abc-123");
    assert_eq!(id.to_string(), "abc-123");
    assert_eq!(id, "abc-123");
    assert_eq!(id.short(3), "abc");
    assert_eq!(id.short(100), "abc-123");
}

#[test]
fn define_id_from_conversions() {
    let a: TestId = "x".into();
    let b: TestId = String::from("x").into();
    assert_eq!(a, b);
}

#[test]
fn short_id_on_str() {
    assert_eq!("abcdef".short(4), "abcd");
    assert_eq!("ab".short(4), "ab");
}

#[test]
fn uuid_id_gen_unique() {
    let id_gen = UuidIdGen;
    let a = id_gen.next();
    let b = id_gen.next();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
}

#[test]
fn sequential_id_gen_counts() {
    let id_gen = SequentialIdGen::new("t");
    assert_eq!(id_gen.next(), "t-1");
    assert_eq!(id_gen.next(), "t-2");

    // Clones share the counter
    let clone = id_gen.clone();
    assert_eq!(clone.next(), "t-3");
    assert_eq!(id_gen.next(), "t-4");
}
