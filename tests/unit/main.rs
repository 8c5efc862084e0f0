// Unit tests for orgbridge components.
// These tests run without external dependencies.

mod support;

mod plan;
mod soql;
