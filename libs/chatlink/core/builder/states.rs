//! Type-state markers for the builder pattern
//!
//! These types are used to track whether a user identity has been set
//! in the builder at compile-time. The address is checked at connect time
//! instead, where a missing one becomes a configuration error state.

use std::marker::PhantomData;

/// Marker trait for user identity state
pub trait UserState {}

/// User id has not been set
pub struct NoUser;
impl UserState for NoUser {}

/// User id has been set
pub struct HasUser;
impl UserState for HasUser {}

/// Phantom marker to prevent direct construction
#[derive(Debug, Clone, Copy)]
pub struct TypeState<U> {
    _user: PhantomData<U>,
}

impl<U> TypeState<U> {
    pub(crate) fn new() -> Self {
        Self { _user: PhantomData }
    }
}

impl<U> Default for TypeState<U> {
    fn default() -> Self {
        Self::new()
    }
}
