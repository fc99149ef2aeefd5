use std::sync::Arc;

use axum_test::TestServer;
use proptest::prelude::*;
use serde_json::json;

use eki::{
    Application, ClassKey, Container, ErrorList, FieldDescriptor, FieldValue, MetadataStore,
    RequestData, ValidationError, bind, route_path,
};

mod strategies {
    use super::*;

    /// A path fragment with arbitrary leading, trailing and repeated slashes.
    pub fn messy_path_strategy() -> impl Strategy<Value = String> {
        let segments = prop::collection::vec(("[a-z:]{1,6}", 1usize..4), 0..4);
        (segments, 0usize..3, 0usize..3).prop_map(|(segments, lead, trail)| {
            let mut path = "/".repeat(lead);
            for (idx, (segment, slashes)) in segments.iter().enumerate() {
                if idx > 0 {
                    path.push_str(&"/".repeat(*slashes));
                }
                path.push_str(segment);
            }
            path.push_str(&"/".repeat(trail));
            path
        })
    }

    /// Errors as `(field, message)`, with `None` for model-level ones.
    pub fn errors_strategy() -> impl Strategy<Value = Vec<(Option<String>, String)>> {
        prop::collection::vec((prop::option::of("[a-c]"), "[a-z]{1,8}"), 0..20)
    }
}

fn counter_store() -> MetadataStore {
    let store = MetadataStore::new();
    store
        .model("Counter")
        .field(FieldDescriptor::int("count"))
        .register()
        .unwrap();
    store
}

proptest! {
    #[test]
    fn route_paths_are_normalized(
        prefix in strategies::messy_path_strategy(),
        path in strategies::messy_path_strategy(),
    ) {
        let joined = route_path(&prefix, &path);
        prop_assert!(joined.starts_with('/'));
        prop_assert!(!joined.contains("//"));
        prop_assert!(joined == "/" || !joined.ends_with('/'));
        prop_assert_eq!(route_path("", &joined), joined.clone());
        prop_assert_eq!(route_path(&joined, "/"), joined);
    }

    #[test]
    fn integer_strings_bind_as_ints(n in any::<i64>()) {
        let store = counter_store();
        let data = RequestData::new().with_body("count", json!(n.to_string()));
        let model = bind(&store, &ClassKey::new("Counter"), &data).unwrap();
        prop_assert_eq!(model.get("count"), Some(&FieldValue::Int(n)));
        prop_assert!(model.binding_errors().is_empty());
    }

    #[test]
    fn non_integers_never_panic(raw in "\\PC*") {
        let store = counter_store();
        let data = RequestData::new().with_body("count", json!(raw.clone()));
        let model = bind(&store, &ClassKey::new("Counter"), &data).unwrap();
        match raw.trim().parse::<i64>() {
            Ok(n) => prop_assert_eq!(model.get("count"), Some(&FieldValue::Int(n))),
            Err(_) => {
                prop_assert_eq!(model.binding_errors().count(), 1);
                prop_assert_eq!(model.get("count"), Some(&FieldValue::from(raw)));
            }
        }
    }

    #[test]
    fn error_counts_add_up(errors in strategies::errors_strategy()) {
        let mut list = ErrorList::new();
        for (field, message) in &errors {
            match field {
                Some(field) => list.add(ValidationError::for_property("with", field.as_str(), message.as_str())),
                None => list.add(ValidationError::new("with", message.as_str())),
            }
        }
        prop_assert_eq!(list.count(), errors.len());
        prop_assert_eq!(list.messages().len(), errors.len());
        let model_level = errors.iter().filter(|(field, _)| field.is_none()).count();
        prop_assert_eq!(list.get(None).len(), model_level);

        let mut merged = ErrorList::new();
        merged.merge(&list);
        prop_assert_eq!(merged.count(), list.count());
        list.clear();
        prop_assert!(list.is_empty());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10))]

    #[test]
    fn status_results_become_response_statuses(status in 200u16..600) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let outcome: Result<(), TestCaseError> = runtime.block_on(async {
            struct PingsController;
            let mut container = Container::new();
            container.singleton("PingsController", PingsController);
            let mut app = Application::new(Arc::new(MetadataStore::new()), Arc::new(container));
            app.controller::<PingsController>("PingsController")
                .action("index", move |_, _| async move { Ok(status) })
                .register()
                .unwrap();
            let server = TestServer::new(app.into_router().unwrap()).unwrap();
            let response = server.get("/pings").await;
            prop_assert_eq!(response.status_code().as_u16(), status);
            Ok(())
        });
        outcome?;
    }
}
