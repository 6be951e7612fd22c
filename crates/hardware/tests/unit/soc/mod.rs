//! System-on-Chip Component Tests.
//!
//! This module covers the component graph: typed ports, caches, crossbars, the memory
//! controller and the builder that wires them into a complete system.

/// Unit tests for system construction, validation and isomorphism.
pub mod builder;




/// Unit tests for the port registry.
pub mod ports;
