//! End-to-end tests of the serial bridge against the loopback backend.
//! See the `tests` directory.
