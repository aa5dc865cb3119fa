//! # UI Module
//!
//! This module contains the layout of the pitch trace window.

pub mod main_display;
