#[cfg(test)]
mod tests {
    use crate::schemas::ApiDoc;
    use utoipa::OpenApi;
    use utoipa::openapi::PathItemType;

    #[test]
    fn test_openapi_schema_generation() {
        let openapi = ApiDoc::openapi();

        assert!(openapi.components.is_some());
        let components = openapi.components.as_ref().unwrap();
        for schema in [
            "ErrorResponse",
            "HealthResponse",
            "MoneyDto",
            "AgreementResponse",
            "InstallmentResponse",
            "TransactionResponse",
            "FinancialSummaryDto",
        ] {
            assert!(components.schemas.contains_key(schema), "missing schema {}", schema);
        }

        assert!(serde_json::to_string(&openapi).is_ok());
    }

    #[test]
    fn test_error_response_schema_structure() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.as_ref().unwrap();
        let error_response_schema = components.schemas.get("ErrorResponse").unwrap();

        if let utoipa::openapi::RefOr::T(utoipa::openapi::schema::Schema::Object(obj)) = error_response_schema {
            let properties = &obj.properties;
            assert!(properties.contains_key("error"));
            assert!(properties.contains_key("code"));
            assert!(properties.contains_key("success"));
        } else {
            panic!("ErrorResponse should be an object schema");
        }
    }

    #[test]
    fn test_openapi_documents_every_route() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;

        let expected = [
            ("/health", PathItemType::Get, "GET"),
            ("/api/v1/agreements", PathItemType::Post, "POST"),
            ("/api/v1/agreements", PathItemType::Get, "GET"),
            ("/api/v1/agreements/{agreement_id}", PathItemType::Get, "GET"),
            ("/api/v1/agreements/{agreement_id}", PathItemType::Patch, "PATCH"),
            ("/api/v1/agreements/{agreement_id}/cancel", PathItemType::Post, "POST"),
            ("/api/v1/agreements/{agreement_id}/installments", PathItemType::Get, "GET"),
            ("/api/v1/agreements/{agreement_id}/payments", PathItemType::Get, "GET"),
            ("/api/v1/installments", PathItemType::Get, "GET"),
            ("/api/v1/installments/reminders", PathItemType::Get, "GET"),
            ("/api/v1/installments/{installment_id}/payment", PathItemType::Post, "POST"),
            ("/api/v1/installments/{installment_id}/reminder-sent", PathItemType::Post, "POST"),
            ("/api/v1/installments/{installment_id}/payments", PathItemType::Get, "GET"),
            ("/api/v1/schedule/preview", PathItemType::Post, "POST"),
            ("/api/v1/categories", PathItemType::Post, "POST"),
            ("/api/v1/categories", PathItemType::Get, "GET"),
            ("/api/v1/transactions", PathItemType::Post, "POST"),
            ("/api/v1/transactions", PathItemType::Get, "GET"),
            ("/api/v1/transactions/{transaction_id}", PathItemType::Get, "GET"),
            ("/api/v1/transactions/{transaction_id}", PathItemType::Patch, "PATCH"),
            ("/api/v1/transactions/{transaction_id}", PathItemType::Delete, "DELETE"),
            ("/api/v1/transactions/{transaction_id}/approve", PathItemType::Post, "POST"),
            ("/api/v1/transactions/{transaction_id}/reject", PathItemType::Post, "POST"),
            ("/api/v1/summary", PathItemType::Get, "GET"),
            ("/api/v1/summary/yearly", PathItemType::Get, "GET"),
        ];

        for (path, method, method_name) in expected {
            let item = paths
                .get(path)
                .unwrap_or_else(|| panic!("path {} is not documented", path));
            assert!(
                item.operations.contains_key(&method),
                "{} {} is not documented",
                method_name,
                path
            );
        }
    }

    #[test]
    fn test_conflict_responses_are_documented() {
        let openapi = ApiDoc::openapi();
        let payment = openapi
            .paths
            .paths
            .get("/api/v1/installments/{installment_id}/payment")
            .unwrap();
        let post = payment.operations.get(&PathItemType::Post).unwrap();
        assert!(post.responses.responses.contains_key("201"));
        assert!(post.responses.responses.contains_key("409"));
    }

    #[test]
    fn test_all_error_responses_reference_correct_schema() {
        let openapi = ApiDoc::openapi();
        let openapi_json = serde_json::to_string(&openapi).unwrap();

        assert!(!openapi_json.contains("crate.schemas.ErrorResponse"));
        assert!(!openapi_json.contains("crate::schemas::ErrorResponse"));
        assert!(openapi_json.contains("ErrorResponse"));
    }
}
