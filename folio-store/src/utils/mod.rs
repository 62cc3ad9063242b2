//! Utility helpers shared by the services

pub mod validation;
