use serde::Deserialize;
use validator::Validate;

use crate::models::payment::PaymentRequest;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StkPushBody {
    #[validate(length(min = 1, message = "phoneNumber is required"))]
    pub phone_number: String,

    #[validate(range(exclusive_min = 0.0, message = "amount must be greater than 0"))]
    pub amount: f64,

    pub account_reference: Option<String>,
    pub transaction_desc: Option<String>,
}

impl From<StkPushBody> for PaymentRequest {
    fn from(body: StkPushBody) -> Self {
        PaymentRequest {
            phone_number: body.phone_number,
            amount: body.amount,
            account_reference: body.account_reference,
            transaction_desc: body.transaction_desc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_camel_case_body() {
        let body: StkPushBody =
            serde_json::from_value(json!({ "phoneNumber": "712345678", "amount": 300 })).unwrap();
        assert!(body.validate().is_ok());
        let request = PaymentRequest::from(body);
        assert_eq!(request, PaymentRequest::new("712345678", 300.0));
    }

    #[test]
    fn rejects_non_positive_amount() {
        for amount in [0.0, -5.0] {
            let body: StkPushBody =
                serde_json::from_value(json!({ "phoneNumber": "712345678", "amount": amount }))
                    .unwrap();
            assert!(body.validate().is_err());
        }
    }

    #[test]
    fn rejects_empty_phone() {
        let body: StkPushBody =
            serde_json::from_value(json!({ "phoneNumber": "", "amount": 10 })).unwrap();
        assert!(body.validate().is_err());
    }
}
