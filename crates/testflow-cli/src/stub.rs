//! Commands delegated to collaborators outside this engine: an interactive
//! scaffold, the companion dashboard UI, and OpenAPI/Postman import-export.
//! None of these touch discovery or the scheduler, so they're kept as thin
//! stubs rather than half-built integrations.

use crate::args::DashboardAction;
use crate::error::CliError;

pub fn init() -> Result<(), CliError> {
    Err(CliError::NotImplemented("init".to_string()))
}

pub fn dashboard(action: DashboardAction) -> Result<(), CliError> {
    Err(CliError::NotImplemented(format!("dashboard {action}")))
}

pub fn import_openapi() -> Result<(), CliError> {
    Err(CliError::NotImplemented("import openapi".to_string()))
}

pub fn import_postman() -> Result<(), CliError> {
    Err(CliError::NotImplemented("import postman".to_string()))
}

pub fn export_postman() -> Result<(), CliError> {
    Err(CliError::NotImplemented("export postman".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stub_reports_not_implemented() {
        assert!(matches!(init(), Err(CliError::NotImplemented(_))));
        assert!(matches!(dashboard(DashboardAction::Serve), Err(CliError::NotImplemented(_))));
        assert!(matches!(import_openapi(), Err(CliError::NotImplemented(_))));
        assert!(matches!(import_postman(), Err(CliError::NotImplemented(_))));
        assert!(matches!(export_postman(), Err(CliError::NotImplemented(_))));
    }
}
