#![forbid(unsafe_code)]

//! Mount a node tree against observed data.
//!
//! # Design
//! [`ViewModel`] owns the observed root and every binding it creates. Mount
//! walks the fragment depth-first:
//! - a text node whose template has placeholders gets one binding per
//!   placeholder. Each binding stores its latest rendered value in a slot
//!   shared by the node's bindings and re-renders the whole template.
//! - an `input` element carrying the model attribute is initialised from its
//!   path, gets a binding that pushes data into the input, and is registered
//!   so [`ViewModel::input`] can write edits back.
//!
//! # Failure Modes
//! Mount stops at the first site whose path does not resolve. Sites bound
//! before it stay live; the caller decides whether to `unmount`.

use std::cell::RefCell;
use std::rc::Rc;

use fbind_core::{
    Binding, BindingOptions, LookupError, NotifyReport, ObservedObject, Path, Value,
    create_binding_with, observe, read, write, write_path,
};

use crate::config::ViewConfig;
use crate::error::{MountError, ViewError};
use crate::interpolate::Template;
use crate::node::NodeRef;

struct InputSite {
    node: NodeRef,
    path: Path,
}

/// Observed data plus the bindings mounted against it.
pub struct ViewModel {
    root: ObservedObject,
    config: ViewConfig,
    options: BindingOptions,
    bindings: Vec<Binding>,
    inputs: Vec<InputSite>,
}

impl std::fmt::Debug for ViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewModel")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("bindings", &self.bindings.len())
            .field("inputs", &self.inputs.len())
            .finish()
    }
}

impl ViewModel {
    /// Observe `data` with configuration from the environment.
    pub fn new(data: serde_json::Value) -> Result<Self, ViewError> {
        Self::with_config(data, ViewConfig::from_env())
    }

    pub fn with_config(data: serde_json::Value, config: ViewConfig) -> Result<Self, ViewError> {
        match observe(data) {
            Value::Object(root) => Ok(Self::from_root(root, config)),
            other => Err(ViewError::NotAnObject {
                found: other.kind(),
            }),
        }
    }

    /// Wrap an already observed root.
    #[must_use]
    pub fn from_root(root: ObservedObject, config: ViewConfig) -> Self {
        Self {
            root,
            config,
            options: BindingOptions::default(),
            bindings: Vec::new(),
            inputs: Vec::new(),
        }
    }

    /// Override options for bindings created by later mounts.
    #[must_use]
    pub fn with_options(mut self, options: BindingOptions) -> Self {
        self.options = options;
        self
    }

    /// The observed root. Writes through it notify mounted sites.
    #[must_use]
    pub fn data(&self) -> &ObservedObject {
        &self.root
    }

    #[must_use]
    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Top-level property read, forwarded to the root.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.root.get(key)
    }

    /// Top-level property write, forwarded to the root.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> NotifyReport {
        self.root.set(key, value)
    }

    pub fn read(&self, path: &str) -> Result<Value, LookupError> {
        read(&self.root, path)
    }

    pub fn write(&self, path: &str, value: impl Into<Value>) -> Result<NotifyReport, LookupError> {
        write(&self.root, path, value)
    }

    /// Bind every site in `fragment`. Returns the number of bindings made.
    pub fn mount(&mut self, fragment: &NodeRef) -> Result<usize, MountError> {
        let before = self.bindings.len();
        let result = self.mount_node(fragment);
        let created = self.bindings.len() - before;
        match &result {
            Ok(()) => tracing::debug!(bindings = created, "view.mount"),
            Err(err) => tracing::warn!(bindings = created, error = %err, "view.mount failed"),
        }
        result.map(|()| created)
    }

    fn mount_node(&mut self, node: &NodeRef) -> Result<(), MountError> {
        if let Some(content) = node.text() {
            return self.mount_text(node, &content);
        }
        if self.is_bound_input(node) {
            self.mount_input(node)?;
        }
        for child in node.children() {
            self.mount_node(&child)?;
        }
        Ok(())
    }

    fn is_bound_input(&self, node: &NodeRef) -> bool {
        node.tag()
            .is_some_and(|tag| tag.eq_ignore_ascii_case("input"))
            && self.model_path(node).is_some()
    }

    fn model_path(&self, node: &NodeRef) -> Option<String> {
        node.find_attr(|name| self.config.is_model_attr(name))
    }

    fn mount_text(&mut self, node: &NodeRef, content: &str) -> Result<(), MountError> {
        let template = Template::parse(content, &self.config.open, &self.config.close);
        if !template.has_placeholders() {
            return Ok(());
        }
        let paths: Vec<String> = template.paths().map(str::to_owned).collect();
        let site_error = |path: &str, source| MountError {
            path: path.to_owned(),
            site: content.to_owned(),
            source,
        };

        let mut initial = Vec::with_capacity(paths.len());
        for path in &paths {
            let value = read(&self.root, path).map_err(|err| site_error(path, err))?;
            initial.push(value.to_string());
        }
        let rendered = Rc::new(RefCell::new(initial));
        let template = Rc::new(template);
        node.set_text(template.render(rendered.borrow().as_slice()));

        for (index, path) in paths.iter().enumerate() {
            let node = node.clone();
            let rendered = Rc::clone(&rendered);
            let template = Rc::clone(&template);
            let binding = create_binding_with(&self.root, path, self.options, move |value| {
                let text = {
                    let mut slots = rendered.borrow_mut();
                    slots[index] = value.to_string();
                    template.render(slots.as_slice())
                };
                node.set_text(text);
            })
            .map_err(|err| site_error(path, err))?;
            tracing::trace!(path = %path, watcher = %binding.id(), "view.bind text");
            self.bindings.push(binding);
        }
        Ok(())
    }

    fn mount_input(&mut self, node: &NodeRef) -> Result<(), MountError> {
        let Some(raw) = self.model_path(node) else {
            return Ok(());
        };
        let site_error = |source| MountError {
            path: raw.clone(),
            site: "<input>".to_owned(),
            source,
        };
        let path = Path::parse(&raw).map_err(site_error)?;
        let value = path.evaluate(&self.root).map_err(site_error)?;
        node.set_value(value.to_string());

        let target = node.clone();
        let binding = create_binding_with(&self.root, path.as_str(), self.options, move |value| {
            target.set_value(value.to_string());
        })
        .map_err(site_error)?;
        tracing::trace!(path = %path, watcher = %binding.id(), "view.bind input");
        self.bindings.push(binding);
        self.inputs.push(InputSite {
            node: node.clone(),
            path,
        });
        Ok(())
    }

    /// Route a user edit: set the input's value and write the text into the
    /// bound path.
    pub fn input(&self, node: &NodeRef, text: &str) -> Result<NotifyReport, ViewError> {
        let site = self
            .inputs
            .iter()
            .find(|site| site.node.ptr_eq(node))
            .ok_or(ViewError::UnboundInput)?;
        site.node.set_value(text);
        tracing::debug!(path = %site.path, "view.input");
        write_path(&self.root, &site.path, text).map_err(|source| ViewError::Write {
            path: site.path.to_string(),
            source,
        })
    }

    /// Bound inputs in mount order.
    #[must_use]
    pub fn inputs(&self) -> Vec<NodeRef> {
        self.inputs.iter().map(|site| site.node.clone()).collect()
    }

    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Dispose every binding this model created.
    pub fn unmount(&mut self) {
        for binding in self.bindings.drain(..) {
            binding.dispose();
        }
        self.inputs.clear();
    }
}

impl Drop for ViewModel {
    fn drop(&mut self) {
        self.unmount();
    }
}
