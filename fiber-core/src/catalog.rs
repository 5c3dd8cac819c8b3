//! Catalog of controller types for tooling
//!
//! Tooling picks a controller type by name, lists the available types with
//! their descriptions, and inspects which channels each part subscribes to.
//! The core only reads from here when constructing by name.

use crate::descriptor::ControllerType;
use fiber_types::Channel;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::any::TypeId;
use std::fmt::Write;
use std::rc::Rc;

/// Label of the "no controller" entry at the top of a listing
pub const NONE_ENTRY: &str = "None";

static WORD_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
static ACRONYM_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z])([A-Z][a-z])").unwrap());

/// Turn a type name into a display label: `PlayerController` becomes
/// `Player Controller`, `HUDView` becomes `HUD View`.
pub fn nicify(name: &str) -> String {
    let name = name.trim_start_matches('_');
    let spaced = WORD_BOUNDARY.replace_all(name, "$1 $2");
    let spaced = ACRONYM_BOUNDARY.replace_all(&spaced, "$1 $2");
    spaced.replace('_', " ")
}

/// One row of a catalog listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub display_name: String,
    pub type_name: &'static str,
    pub description: Option<String>,
    pub hidden: bool,
    pub model: Option<&'static str>,
    pub view: Option<&'static str>,
    pub channels: Vec<Channel>,
    pub model_channels: Vec<Channel>,
    pub view_channels: Vec<Channel>,
    pub persistent: bool,
}

impl CatalogEntry {
    fn of(ty: &ControllerType) -> Self {
        Self {
            display_name: ty.display_name(),
            type_name: ty.type_name(),
            description: ty.description().map(str::to_string),
            hidden: ty.is_hidden(),
            model: ty.model().declared.then_some(ty.model().type_name),
            view: ty.view().declared.then_some(ty.view().type_name),
            channels: ty.channels().to_vec(),
            model_channels: ty.model().channels.clone(),
            view_channels: ty.view().channels.clone(),
            persistent: ty.configuration().persistent,
        }
    }
}

/// Every controller type known to a context
#[derive(Debug, Default)]
pub struct Catalog {
    types: Vec<Rc<ControllerType>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type, replacing any earlier descriptor for the same controller
    pub fn register(&mut self, ty: ControllerType) -> Rc<ControllerType> {
        let ty = Rc::new(ty);
        match self.types.iter_mut().find(|t| t.type_id() == ty.type_id()) {
            Some(slot) => *slot = ty.clone(),
            None => self.types.push(ty.clone()),
        }
        ty
    }

    pub fn get(&self, type_id: TypeId) -> Option<Rc<ControllerType>> {
        self.types.iter().find(|t| t.type_id() == type_id).cloned()
    }

    pub fn get_of<C: 'static>(&self) -> Option<Rc<ControllerType>> {
        self.get(TypeId::of::<C>())
    }

    /// Look a type up by short type name or display name (case-insensitive)
    pub fn find(&self, name: &str) -> Option<Rc<ControllerType>> {
        self.types
            .iter()
            .find(|t| t.type_name() == name)
            .or_else(|| {
                self.types
                    .iter()
                    .find(|t| t.display_name().eq_ignore_ascii_case(name))
            })
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<ControllerType>> {
        self.types.iter()
    }

    /// Entries sorted by display name; hidden types only when asked for
    pub fn entries(&self, include_hidden: bool) -> Vec<CatalogEntry> {
        let mut entries: Vec<_> = self
            .types
            .iter()
            .filter(|t| include_hidden || !t.is_hidden())
            .map(|t| CatalogEntry::of(t))
            .collect();
        entries.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        entries
    }

    pub fn entry(&self, name: &str) -> Option<CatalogEntry> {
        self.find(name).map(|t| CatalogEntry::of(&t))
    }

    /// Selection labels as tooling shows them: `None` first, then every
    /// visible type
    pub fn labels(&self) -> Vec<String> {
        std::iter::once(NONE_ENTRY.to_string())
            .chain(self.entries(false).into_iter().map(|e| e.display_name))
            .collect()
    }

    /// Plain-text listing, one type per line
    pub fn render_listing(&self, include_hidden: bool) -> String {
        let entries = self.entries(include_hidden);
        let width = entries
            .iter()
            .map(|e| e.display_name.len())
            .max()
            .unwrap_or(0)
            .max(NONE_ENTRY.len());

        let mut out = String::new();
        let _ = writeln!(out, "{NONE_ENTRY}");
        for entry in &entries {
            let mut line = format!("{:<width$}", entry.display_name);
            if let Some(description) = &entry.description {
                let _ = write!(line, "  {description}");
            }
            if entry.hidden {
                line.push_str("  (hidden)");
            }
            let _ = writeln!(out, "{}", line.trim_end());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Component;
    use crate::component::{Controller, NoModel, NoView};

    macro_rules! bare_controller {
        ($name:ident) => {
            #[derive(Default)]
            struct $name;
            impl Component for $name {}
            impl Controller for $name {
                type Model = NoModel;
                type View = NoView;
            }
        };
    }

    bare_controller!(PlayerController);
    bare_controller!(HUDView);
    bare_controller!(AudioMixer);

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.register(
            ControllerType::builder::<PlayerController>()
                .description("Moves the player")
                .build(),
        );
        catalog.register(ControllerType::builder::<HUDView>().hidden().build());
        catalog.register(
            ControllerType::builder::<AudioMixer>()
                .display_name("Mixer")
                .build(),
        );
        catalog
    }

    #[test]
    fn test_nicify() {
        assert_eq!(nicify("PlayerController"), "Player Controller");
        assert_eq!(nicify("HUDView"), "HUD View");
        assert_eq!(nicify("Level2Boss"), "Level2 Boss");
        assert_eq!(nicify("_privateThing"), "private Thing");
        assert_eq!(nicify("Plain"), "Plain");
    }

    #[test]
    fn test_find_by_type_or_display_name() {
        let catalog = catalog();
        assert!(catalog.find("PlayerController").is_some());
        assert!(catalog.find("player controller").is_some());
        assert!(catalog.find("Mixer").is_some());
        assert!(catalog.find("Nope").is_none());
    }

    #[test]
    fn test_register_replaces_same_type() {
        let mut catalog = catalog();
        catalog.register(
            ControllerType::builder::<PlayerController>()
                .description("Moves the player faster")
                .build(),
        );
        assert_eq!(catalog.len(), 3);
        let ty = catalog.get_of::<PlayerController>().unwrap();
        assert_eq!(ty.description(), Some("Moves the player faster"));
    }

    #[test]
    fn test_labels_hide_hidden_types() {
        assert_eq!(catalog().labels(), vec!["None", "Mixer", "Player Controller"]);
    }

    #[test]
    fn test_render_listing() {
        insta::assert_snapshot!(catalog().render_listing(true), @r"
        None
        HUD View           (hidden)
        Mixer
        Player Controller  Moves the player
        ");
    }
}
