//! Coercion of supplied parameter values to declared parameter types.

use std::sync::Arc;

use super::{TypeDesc, TypeOracle};
use crate::registration::Instance;

/// Converts `value` (of type `from`) to `to`.
///
/// Identity and declared assignability pass the instance through untouched;
/// otherwise lossless numeric widening and `&'static str` to `String` are
/// attempted. Returns `None` when no conversion exists.
///
/// String conversion is one-way: a `String` shared behind an [`Instance`]
/// cannot be borrowed for `'static` without leaking it.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{TypeCatalog, TypeDesc};
/// use ferrous_ioc::types::convert::convert;
/// use std::sync::Arc;
///
/// let catalog = TypeCatalog::new();
/// let value = Arc::new(7i32) as ferrous_ioc::Instance;
/// let widened = convert(&catalog, &value, &TypeDesc::of::<i32>(), &TypeDesc::of::<i64>()).unwrap();
/// assert_eq!(*widened.downcast::<i64>().unwrap(), 7);
/// ```
pub fn convert(oracle: &dyn TypeOracle, value: &Instance, from: &TypeDesc, to: &TypeDesc) -> Option<Instance> {
    if from == to || oracle.is_assignable(from, to) {
        return Some(value.clone());
    }
    widen(value, to)
}

macro_rules! widen_into {
    ($value:expr, $target:ty, [$($src:ty),*]) => {{
        $(
            if let Some(v) = $value.downcast_ref::<$src>() {
                return Some(Arc::new(<$target>::from(*v)) as Instance);
            }
        )*
        None
    }};
}

fn widen(value: &Instance, to: &TypeDesc) -> Option<Instance> {
    if *to == TypeDesc::of::<i16>() {
        widen_into!(value, i16, [i8, u8])
    } else if *to == TypeDesc::of::<i32>() {
        widen_into!(value, i32, [i8, i16, u8, u16])
    } else if *to == TypeDesc::of::<i64>() {
        widen_into!(value, i64, [i8, i16, i32, u8, u16, u32])
    } else if *to == TypeDesc::of::<i128>() {
        widen_into!(value, i128, [i8, i16, i32, i64, u8, u16, u32, u64])
    } else if *to == TypeDesc::of::<u16>() {
        widen_into!(value, u16, [u8])
    } else if *to == TypeDesc::of::<u32>() {
        widen_into!(value, u32, [u8, u16])
    } else if *to == TypeDesc::of::<u64>() {
        widen_into!(value, u64, [u8, u16, u32])
    } else if *to == TypeDesc::of::<u128>() {
        widen_into!(value, u128, [u8, u16, u32, u64])
    } else if *to == TypeDesc::of::<usize>() {
        widen_into!(value, usize, [u8, u16])
    } else if *to == TypeDesc::of::<f32>() {
        widen_into!(value, f32, [i8, i16, u8, u16])
    } else if *to == TypeDesc::of::<f64>() {
        widen_into!(value, f64, [f32, i8, i16, i32, u8, u16, u32])
    } else if *to == TypeDesc::of::<String>() {
        value
            .downcast_ref::<&'static str>()
            .map(|s| Arc::new(s.to_string()) as Instance)
    } else {
        None
    }
}
