// src/ui/widgets/mod.rs

pub mod findings_view; // The scrollable findings report.
pub mod footer;        // Key hints and export status.
pub mod input;         // The target input field.
pub mod summary;       // CMS, OS and counts at a glance.
