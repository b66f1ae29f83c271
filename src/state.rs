use std::sync::Arc;

use crate::services::mpesa_service::MpesaService;

#[derive(Clone)]
pub struct AppState {
    pub mpesa_service: Arc<MpesaService>,
}

impl AppState {
    pub fn new(mpesa_service: MpesaService) -> Self {
        AppState {
            mpesa_service: Arc::new(mpesa_service),
        }
    }
}
