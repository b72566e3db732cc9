pub(crate) mod callback_controller;
pub(crate) mod health_check_controller;
