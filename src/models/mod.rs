//! Core value types of the photo gallery.
//!
//! Object names address the bucket; image values carry an upload from the
//! media gate to the storage facade and never outlive a request.

pub mod media;
pub mod object_name;
