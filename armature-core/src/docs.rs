//! Handler documentation registry.
//!
//! Rust keeps no doc comments at runtime, so controllers register the text
//! of their handler docs here, keyed by controller and method name. Route
//! introspection tools read it back.
//!
//! ```rust
//! use armature_core::docs::HandlerDocs;
//!
//! let mut docs = HandlerDocs::new();
//! docs.register("UserController", "index", Some("List users."));
//! docs.register("ShowProfile", HandlerDocs::INVOKE, None);
//!
//! assert_eq!(docs.doc("UserController", "index"), Some("List users."));
//! assert!(docs.has_method("ShowProfile", HandlerDocs::INVOKE));
//! assert_eq!(docs.doc("ShowProfile", HandlerDocs::INVOKE), None);
//! ```

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct HandlerDocs {
    controllers: HashMap<String, HashMap<String, Option<String>>>,
}

impl HandlerDocs {
    /// Entry point of a single-action controller.
    pub const INVOKE: &'static str = "invoke";

    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `controller` has `method`, with its documentation if any.
    pub fn register(&mut self, controller: &str, method: &str, doc: Option<&str>) {
        self.controllers
            .entry(controller.to_string())
            .or_default()
            .insert(method.to_string(), doc.map(str::to_string));
    }

    pub fn with(mut self, controller: &str, method: &str, doc: Option<&str>) -> Self {
        self.register(controller, method, doc);
        self
    }

    pub fn has_method(&self, controller: &str, method: &str) -> bool {
        self.controllers
            .get(controller)
            .is_some_and(|methods| methods.contains_key(method))
    }

    pub fn doc(&self, controller: &str, method: &str) -> Option<&str> {
        self.controllers
            .get(controller)
            .and_then(|methods| methods.get(method))
            .and_then(|doc| doc.as_deref())
    }
}
