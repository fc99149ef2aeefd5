#[cfg(test)]
pub mod test_helpers {
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use parking_lot::Mutex;
    use serde_json::Value;

    use crate::{
        ClassKey, FieldDescriptor, FieldType, FieldValue, MetadataStore, ModelInstance, RenderError,
        ResponseWriter, ViewContext, ViewRenderer,
    };

    /// A store declaring the `Sample` model: a field of every type the
    /// validators are exercised against, and no validators.
    pub fn sample_store() -> MetadataStore {
        let store = MetadataStore::new();
        store
            .model("Sample")
            .field(FieldDescriptor::string("name"))
            .field(FieldDescriptor::string("email"))
            .field(FieldDescriptor::string("website"))
            .field(FieldDescriptor::string("zip"))
            .field(FieldDescriptor::string("code"))
            .field(FieldDescriptor::string("role"))
            .field(FieldDescriptor::string("id"))
            .field(FieldDescriptor::string("password"))
            .field(FieldDescriptor::string("passwordConfirmation"))
            .field(FieldDescriptor::int("age"))
            .field(FieldDescriptor::number("score"))
            .field(FieldDescriptor::array("tags", FieldType::String))
            .field(FieldDescriptor::array("scores", FieldType::Int))
            .register()
            .expect("Sample declares");
        store
    }

    /// A `Sample` instance holding `values`.
    pub fn instance_with(values: &[(&str, FieldValue)]) -> ModelInstance {
        let metadata = sample_store()
            .resolve_model(&ClassKey::new("Sample"))
            .expect("Sample resolves");
        let mut model = ModelInstance::new(metadata);
        for (property, value) in values {
            model.set(*property, value.clone());
        }
        model
    }

    /// Records every view it is asked to render and writes the view name.
    #[derive(Debug, Default)]
    pub struct RecordingRenderer {
        rendered: Mutex<Vec<(String, StatusCode, Value)>>,
    }

    impl RecordingRenderer {
        /// `(name, status, data)` for each render, in order.
        pub fn rendered(&self) -> Vec<(String, StatusCode, Value)> {
            self.rendered.lock().clone()
        }
    }

    #[async_trait]
    impl ViewRenderer for RecordingRenderer {
        async fn render(&self, view: ViewContext<'_>, out: &mut ResponseWriter) -> Result<(), RenderError> {
            self.rendered
                .lock()
                .push((view.name.to_string(), view.status, view.data.clone()));
            out.write(view.name);
            Ok(())
        }
    }
}
