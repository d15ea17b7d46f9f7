#![cfg(not(loom))]

use crate::Group;

#[test]
#[should_panic(expected = "negative group counter")]
fn over_free_panics() {
    let group = Group::default();
    group.reserve();
    group.free();
    group.free();
}

#[test]
#[should_panic(expected = "negative group counter")]
fn free_of_unreserved_group_panics() {
    let group = Group::new(1);
    group.free_n(1);
}

#[test]
#[should_panic(expected = "invalid group reserve N value")]
fn zero_weight_reserve_panics() {
    let group = Group::new(1);
    let _ = group.reserve_n(None, 0);
}

#[test]
#[should_panic(expected = "invalid group reserve N value")]
fn zero_weight_try_reserve_panics() {
    let group = Group::default();
    let _ = group.try_reserve_n(0);
}

#[test]
#[should_panic(expected = "invalid group free N value")]
fn zero_weight_free_panics() {
    let group = Group::default();
    group.free_n(0);
}

#[test]
#[should_panic(expected = "group already initialized")]
fn set_size_after_new_panics() {
    let group = Group::new(1);
    group.set_size(2);
}

#[test]
#[should_panic(expected = "group already initialized")]
fn set_size_twice_panics() {
    let group = Group::default();
    group.set_size(1);
    group.set_size(2);
}

#[test]
#[should_panic(expected = "concurrent Reserve calls while initializing group")]
fn set_size_after_use_panics() {
    let group = Group::default();
    group.reserve();
    group.set_size(2);
}

#[test]
#[cfg(target_pointer_width = "64")]
#[should_panic(expected = "incorrect group size")]
fn oversized_group_size_panics() {
    let _ = Group::new(u32::MAX as usize + 1);
}
