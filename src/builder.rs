//! Resource tree DSL.

use std::sync::Arc;

use crate::{
    handler::{Handler, ParamConfig},
    pattern::{self, Fragment, ParamMap},
    resource::{Resource, ResourceSet, Verb},
    Config, Result,
};

/// A node of a resource tree under construction.
///
/// Every operation leaves `self` untouched and returns a new node. All nodes
/// derived from the same root register into one shared [`ResourceSet`].
///
/// # Example
///
/// ```
/// use restmount::{Builder, Config, Context, Done, Params};
///
/// fn list(_ctx: Context, _params: Params, done: Done) {
///     done.ok(vec!["Volvo", "Opel"]);
/// }
///
/// fn show(_ctx: Context, params: Params, done: Done) {
///     done.ok(params.get("id"));
/// }
///
/// # fn main() -> Result<(), restmount::BuildError> {
/// let api = Builder::new(Config::new().base_path("api").version("1.0"));
/// let cars = api.resource("cars")?;
/// cars.all(list)?
///     .save(list)?
///     .get("/:id", [("id", r"\d+")], show)?;
///
/// assert_eq!(api.resources().len(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    config: Arc<Config>,
    fragments: Vec<Fragment>,
    params: ParamMap,
    resources: ResourceSet,
}

impl Builder {
    /// Create the root node of a new resource tree.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config.normalized()),
            fragments: Vec::new(),
            params: ParamMap::default(),
            resources: ResourceSet::default(),
        }
    }

    /// Returns the configuration of this tree.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the path of this node.
    #[inline]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Returns the parameters declared along the path of this node.
    #[inline]
    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    /// Returns the collection this node registers into.
    #[inline]
    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    /// Appends a literal segment to the path.
    pub fn resource(&self, segment: &str) -> Result<Self> {
        let mut fragments = self.fragments.clone();
        pattern::append_static(&mut fragments, segment)?;
        Ok(self.with_path(fragments, self.params.clone()))
    }

    /// Registers a `GET` endpoint for one item at `template`, which extends
    /// the current path.
    ///
    /// `params` supplies a validator for every `:name` token in the template;
    /// pass `()` when the template has none.
    pub fn get(
        &self,
        template: &str,
        params: impl Into<ParamConfig>,
        handler: impl Handler,
    ) -> Result<Self> {
        self.register_at(Verb::Get, template, params.into(), Arc::new(handler))
    }

    /// Registers a `PUT` endpoint at `template`, which extends the current
    /// path.
    pub fn update(
        &self,
        template: &str,
        params: impl Into<ParamConfig>,
        handler: impl Handler,
    ) -> Result<Self> {
        self.register_at(Verb::Update, template, params.into(), Arc::new(handler))
    }

    /// Registers a `DELETE` endpoint at `template`, which extends the current
    /// path.
    pub fn delete(
        &self,
        template: &str,
        params: impl Into<ParamConfig>,
        handler: impl Handler,
    ) -> Result<Self> {
        self.register_at(Verb::Delete, template, params.into(), Arc::new(handler))
    }

    /// Registers a `GET` endpoint for the collection at the current path.
    pub fn all(&self, handler: impl Handler) -> Result<Self> {
        self.register(Verb::List, &self.fragments, &self.params, Arc::new(handler))?;
        Ok(self.clone())
    }

    /// Same as [`Builder::all`].
    pub fn get_list(&self, handler: impl Handler) -> Result<Self> {
        self.all(handler)
    }

    /// Registers a `POST` endpoint at the current path.
    pub fn save(&self, handler: impl Handler) -> Result<Self> {
        self.register(Verb::Save, &self.fragments, &self.params, Arc::new(handler))?;
        Ok(self.clone())
    }

    /// Returns an independent node at the same path.
    ///
    /// Further calls on either node never change the other's path.
    pub fn detach(&self) -> Self {
        self.clone()
    }

    /// Returns the node one segment up, forgetting the parameter the last
    /// segment introduced.
    pub fn end(&self) -> Self {
        let mut fragments = self.fragments.clone();
        let mut params = self.params.clone();
        if let Some(Fragment::Param { name, .. }) = fragments.pop() {
            params.remove(&name);
        }
        self.with_path(fragments, params)
    }

    /// Returns a node at the root of the tree, keeping every registered
    /// resource.
    pub fn begin(&self) -> Self {
        self.with_path(Vec::new(), ParamMap::default())
    }

    fn with_path(&self, fragments: Vec<Fragment>, params: ParamMap) -> Self {
        Self {
            config: self.config.clone(),
            fragments,
            params,
            resources: self.resources.clone(),
        }
    }

    fn register_at(
        &self,
        verb: Verb,
        template: &str,
        config: ParamConfig,
        handler: Arc<dyn Handler>,
    ) -> Result<Self> {
        let mut fragments = self.fragments.clone();
        let mut params = self.params.clone();

        for (name, validator) in config.into_entries() {
            pattern::declare_param(&mut params, &name, validator?)?;
        }
        pattern::resolve_param_indices(template, &mut fragments, &mut params)?;
        params.retain(|_, spec| spec.index.is_some());

        self.register(verb, &fragments, &params, handler)?;
        Ok(self.with_path(fragments, params))
    }

    fn register(
        &self,
        verb: Verb,
        fragments: &[Fragment],
        params: &ParamMap,
        handler: Arc<dyn Handler>,
    ) -> Result<()> {
        let matcher = pattern::compile(fragments, &self.config)?;
        tracing::debug!(verb = ?verb, pattern = matcher.as_str(), "register resource");
        self.resources
            .push(Resource::new(verb, matcher, params.clone(), handler));
        Ok(())
    }
}

/// Create the root node of a new resource tree.
pub fn create(config: Config) -> Builder {
    Builder::new(config)
}
