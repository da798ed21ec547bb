//! Well-known job type names.
//!
//! The job type is an open string: any name with a registered handler is
//! valid. These are the types the ERP itself submits.

/// Create a database backup.
pub const BACKUP_CREATE: &str = "backup_create";
/// Restore a database backup.
pub const BACKUP_RESTORE: &str = "backup_restore";
/// Import a spreadsheet of master data.
pub const DATA_IMPORT: &str = "data_import";
/// Render a long-running report.
pub const REPORT_GENERATE: &str = "report_generate";
/// Dispatch an outbound email.
pub const EMAIL_SEND: &str = "email_send";
/// Apply a bulk update across many records.
pub const BULK_UPDATE: &str = "bulk_update";
