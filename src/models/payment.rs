/// A validated payment initiation, as handed to the M-Pesa service.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    /// Local subscriber number without country code.
    pub phone_number: String,
    pub amount: f64,
    pub account_reference: Option<String>,
    pub transaction_desc: Option<String>,
}

impl PaymentRequest {
    pub fn new(phone_number: impl Into<String>, amount: f64) -> Self {
        PaymentRequest {
            phone_number: phone_number.into(),
            amount,
            account_reference: None,
            transaction_desc: None,
        }
    }
}
