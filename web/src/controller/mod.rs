pub(crate) mod azure_auth_controller;
pub(crate) mod health_check_controller;
