//! End-to-end tests for ccdash
//!
//! The scenarios in `tests/` seed a temporary SQLite database, build a
//! `ReportService` over it and check the finished reports.
