//! Editor module.
//! List/add/edit/delete/reorder over an explicit `Configuration`.
//! The free functions never touch the filesystem; `Session` wraps them with
//! lock → reload → mutate → save against a `Store`.

use std::cmp::max;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{Configuration, DEFAULT_CATEGORY, DEFAULT_ICON, LinkEntry, Store};
use crate::error::{LinkError, Result};

// *************** Inputs ***************

/// Fields for a new link. Optional fields fall back to the dashboard defaults.
#[derive(Debug, Clone, Default)]
pub struct NewLink {
    pub label: String,
    pub target: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

/// Partial update for an existing link. `None` leaves a field untouched;
/// an empty description or icon clears it.
#[derive(Debug, Clone, Default)]
pub struct LinkPatch {
    pub label: Option<String>,
    pub target: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl LinkPatch {
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.target.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.icon.is_none()
    }
}

/// Links sharing a category, sorted for display.
#[derive(Debug)]
pub struct CategoryGroup<'a> {
    pub name: &'a str,
    pub links: Vec<&'a LinkEntry>,
}

// *************** Operations ***************

/// Groups links by category. Groups keep the order in which their first link
/// appears; links inside a group sort by `order`, then `id`.
pub fn list(config: &Configuration) -> Vec<CategoryGroup<'_>> {
    let mut groups: Vec<CategoryGroup<'_>> = Vec::new();
    for link in &config.links {
        let name = link.category_name();
        match groups.iter_mut().find(|g| g.name == name) {
            Some(group) => group.links.push(link),
            None => groups.push(CategoryGroup {
                name,
                links: vec![link],
            }),
        }
    }
    for group in &mut groups {
        group
            .links
            .sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    }
    groups
}

/// Appends a link at the end of its category and returns its new id.
pub fn add(config: &mut Configuration, new: NewLink) -> Result<String> {
    let label = required("label", &new.label)?;
    let target = required("target", &new.target)?;
    let category = normalize_category(new.category.as_deref());

    let id = fresh_id(config);
    let order = next_order(config, &category, None)?;
    let icon = new
        .icon
        .as_deref()
        .and_then(non_blank)
        .unwrap_or(DEFAULT_ICON)
        .to_string();

    debug!(%id, %category, order, "adding link");
    config.links.push(LinkEntry {
        id: id.clone(),
        label,
        target,
        category,
        order,
        description: new.description.as_deref().and_then(non_blank).map(str::to_string),
        icon: Some(icon),
    });
    Ok(id)
}

/// Applies `patch` to the link with `id`. Nothing changes unless every supplied field is valid.
pub fn edit(config: &mut Configuration, id: &str, patch: LinkPatch) -> Result<()> {
    let index = position(config, id)?;

    let label = patch.label.as_deref().map(|l| required("label", l)).transpose()?;
    let target = patch.target.as_deref().map(|t| required("target", t)).transpose()?;
    let category = patch.category.as_deref().map(|c| normalize_category(Some(c)));

    if let Some(category) = category {
        if category != config.links[index].category_name() {
            let order = next_order(config, &category, Some(id))?;
            let link = &mut config.links[index];
            debug!(%id, from = %link.category_name(), to = %category, order, "moving link");
            link.category = category;
            link.order = order;
        }
    }

    let link = &mut config.links[index];
    if let Some(label) = label {
        link.label = label;
    }
    if let Some(target) = target {
        link.target = target;
    }
    if let Some(description) = patch.description {
        link.description = non_blank(&description).map(str::to_string);
    }
    if let Some(icon) = patch.icon {
        link.icon = non_blank(&icon).map(str::to_string);
    }
    Ok(())
}

/// Removes the link with `id`. Sibling orders keep their gaps.
pub fn delete(config: &mut Configuration, id: &str) -> Result<LinkEntry> {
    let index = position(config, id)?;
    Ok(config.links.remove(index))
}

/// Moves the link with `id` to `new_order` inside its category. Siblings at or
/// above `new_order` shift up so no two links in the category share an order.
pub fn reorder(config: &mut Configuration, id: &str, new_order: u32) -> Result<()> {
    let index = position(config, id)?;
    let category = config.links[index].category_name().to_string();

    let mut shifted: Vec<usize> = config
        .links
        .iter()
        .enumerate()
        .filter(|(i, link)| {
            *i != index && link.category_name() == category && link.order >= new_order
        })
        .map(|(i, _)| i)
        .collect();
    shifted.sort_by(|&a, &b| {
        let (a, b) = (&config.links[a], &config.links[b]);
        a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id))
    });

    // Cascade so duplicates from a hand-edited file are pulled apart too.
    // Every new order is computed before anything is written.
    let mut floor = new_order;
    let mut moves = Vec::with_capacity(shifted.len());
    for i in shifted {
        let bumped = max(config.links[i].order, floor)
            .checked_add(1)
            .ok_or_else(order_out_of_range)?;
        moves.push((i, bumped));
        floor = bumped;
    }
    for (i, order) in moves {
        config.links[i].order = order;
    }
    config.links[index].order = new_order;
    debug!(%id, %category, new_order, "reordered link");
    Ok(())
}

/// Human-readable listing, one block per category.
pub fn format_list(config: &Configuration) -> String {
    let groups = list(config);
    if groups.is_empty() {
        return "No links currently configured.\n".to_string();
    }

    let mut out = String::new();
    for group in groups {
        out.push_str(group.name);
        out.push('\n');
        for link in group.links {
            out.push_str(&format!("  {:>3}. {}\n", link.order, link.label));
            out.push_str(&format!("       target: {}\n", link.target));
            if let Some(description) = &link.description {
                out.push_str(&format!("       {description}\n"));
            }
            out.push_str(&format!("       id: {}\n", link.id));
        }
    }
    out
}

// *************** Helpers ***************

fn position(config: &Configuration, id: &str) -> Result<usize> {
    config
        .links
        .iter()
        .position(|link| link.id == id)
        .ok_or_else(|| LinkError::NotFound(id.to_string()))
}

fn required(field: &str, value: &str) -> Result<String> {
    non_blank(value)
        .map(str::to_string)
        .ok_or_else(|| LinkError::Validation(format!("{field} cannot be empty")))
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn normalize_category(category: Option<&str>) -> String {
    category
        .and_then(non_blank)
        .unwrap_or(DEFAULT_CATEGORY)
        .to_string()
}

fn next_order(config: &Configuration, category: &str, skip_id: Option<&str>) -> Result<u32> {
    let top = config
        .links
        .iter()
        .filter(|link| link.category_name() == category && Some(link.id.as_str()) != skip_id)
        .map(|link| link.order)
        .max();
    match top {
        None => Ok(0),
        Some(top) => top.checked_add(1).ok_or_else(order_out_of_range),
    }
}

fn order_out_of_range() -> LinkError {
    LinkError::Validation("order out of range".to_string())
}

fn fresh_id(config: &Configuration) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if config.find(&id).is_none() {
            return id;
        }
    }
}

// *************** Session ***************

/// A config held in memory against its store. Mutations lock, refresh from
/// disk when there is nothing unsaved, apply, then save.
#[derive(Debug)]
pub struct Session {
    store: Store,
    config: Configuration,
    dirty: bool,
}

impl Session {
    /// Loads the store, creating an empty document on first run.
    pub fn open(store: Store) -> Result<Self> {
        let config = store.load_or_init()?;
        Ok(Self {
            store,
            config,
            dirty: false,
        })
    }

    /// Wraps an in-memory config that has not been written to `store` yet.
    #[cfg(test)]
    pub fn with_unsaved(store: Store, config: Configuration) -> Self {
        Self {
            store,
            config,
            dirty: true,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// True when the last save failed and the in-memory state is ahead of the file.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn list(&self) -> Vec<CategoryGroup<'_>> {
        list(&self.config)
    }

    pub fn add(&mut self, new: NewLink) -> Result<String> {
        self.apply(|config| add(config, new))
    }

    pub fn edit(&mut self, id: &str, patch: LinkPatch) -> Result<()> {
        self.apply(|config| edit(config, id, patch))
    }

    pub fn delete(&mut self, id: &str) -> Result<LinkEntry> {
        self.apply(|config| delete(config, id))
    }

    pub fn reorder(&mut self, id: &str, new_order: u32) -> Result<()> {
        self.apply(|config| reorder(config, id, new_order))
    }

    /// Writes the in-memory config. Used to retry after a failed save.
    pub fn save(&mut self) -> Result<()> {
        let _lock = self.store.lock()?;
        self.persist()
    }

    fn apply<T>(&mut self, op: impl FnOnce(&mut Configuration) -> Result<T>) -> Result<T> {
        let _lock = self.store.lock()?;
        if !self.dirty {
            self.config = self.store.load_or_init()?;
        }
        let value = op(&mut self.config)?;
        self.dirty = true;
        self.persist()?;
        Ok(value)
    }

    fn persist(&mut self) -> Result<()> {
        match self.store.save(&self.config) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                warn!("change kept in memory but not saved: {e}");
                Err(e)
            }
        }
    }
}

// *************** Tests ***************

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use tempfile::TempDir;

    fn link(label: &str, category: Option<&str>) -> NewLink {
        NewLink {
            label: label.to_string(),
            target: format!("https://example.com/{}", label.to_lowercase()),
            category: category.map(str::to_string),
            ..NewLink::default()
        }
    }

    fn order_of(config: &Configuration, id: &str) -> u32 {
        config.find(id).unwrap().order
    }

    fn assert_unique_orders(config: &Configuration) {
        for group in list(config) {
            let mut orders: Vec<u32> = group.links.iter().map(|l| l.order).collect();
            let before = orders.len();
            orders.dedup();
            assert_eq!(before, orders.len(), "duplicate order in {}", group.name);
        }
    }

    #[test]
    fn test_add_without_category_lands_in_uncategorized() {
        let mut config = Configuration::default();
        let id = add(
            &mut config,
            NewLink {
                label: "Docs".into(),
                target: "https://example.com".into(),
                ..NewLink::default()
            },
        )
        .unwrap();

        let entry = config.find(&id).unwrap();
        assert_eq!(entry.category, DEFAULT_CATEGORY);
        assert_eq!(entry.order, 0);
        assert_eq!(entry.icon.as_deref(), Some(DEFAULT_ICON));

        let groups = list(&config);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, DEFAULT_CATEGORY);
        assert_eq!(groups[0].links[0].id, id);
    }

    #[test]
    fn test_add_assigns_unique_ids_and_next_order() {
        let mut config = Configuration::default();
        let first = add(&mut config, link("Git", Some("Tools"))).unwrap();
        let second = add(&mut config, link("CI", Some("Tools"))).unwrap();
        let other = add(&mut config, link("Mail", Some("Comms"))).unwrap();

        assert_ne!(first, second);
        assert_eq!(order_of(&config, &first), 0);
        assert_eq!(order_of(&config, &second), 1);
        assert_eq!(order_of(&config, &other), 0);
        assert_eq!(config.links.iter().filter(|l| l.id == second).count(), 1);
    }

    #[test]
    fn test_add_after_gap_uses_max_plus_one() {
        let mut config = Configuration::default();
        let a = add(&mut config, link("A", Some("Tools"))).unwrap();
        add(&mut config, link("B", Some("Tools"))).unwrap();
        reorder(&mut config, &a, 7).unwrap();

        let c = add(&mut config, link("C", Some("Tools"))).unwrap();
        assert_eq!(order_of(&config, &c), 8);
    }

    #[test]
    fn test_add_rejects_empty_label_or_target() {
        let mut config = Configuration::default();
        let err = add(
            &mut config,
            NewLink {
                label: "  ".into(),
                target: "https://example.com".into(),
                ..NewLink::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, LinkError::Validation(_)));

        let err = add(
            &mut config,
            NewLink {
                label: "Docs".into(),
                target: String::new(),
                ..NewLink::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, LinkError::Validation(_)));
        assert!(config.links.is_empty());
    }

    #[test]
    fn test_add_trims_and_drops_blank_description() {
        let mut config = Configuration::default();
        let id = add(
            &mut config,
            NewLink {
                label: " Docs ".into(),
                target: " docs.html ".into(),
                category: Some("  ".into()),
                description: Some("   ".into()),
                icon: Some("fas fa-book".into()),
            },
        )
        .unwrap();
        let entry = config.find(&id).unwrap();
        assert_eq!(entry.label, "Docs");
        assert_eq!(entry.target, "docs.html");
        assert_eq!(entry.category, DEFAULT_CATEGORY);
        assert!(entry.description.is_none());
        assert_eq!(entry.icon.as_deref(), Some("fas fa-book"));
    }

    #[test]
    fn test_edit_updates_only_supplied_fields() {
        let mut config = Configuration::default();
        let id = add(&mut config, link("Docs", Some("Reference"))).unwrap();

        edit(
            &mut config,
            &id,
            LinkPatch {
                label: Some("Manual".into()),
                description: Some("The manual".into()),
                ..LinkPatch::default()
            },
        )
        .unwrap();

        let entry = config.find(&id).unwrap();
        assert_eq!(entry.label, "Manual");
        assert_eq!(entry.target, "https://example.com/docs");
        assert_eq!(entry.category, "Reference");
        assert_eq!(entry.description.as_deref(), Some("The manual"));
    }

    #[test]
    fn test_edit_rejects_empty_target_without_partial_update() {
        let mut config = Configuration::default();
        let id = add(&mut config, link("Docs", None)).unwrap();

        let err = edit(
            &mut config,
            &id,
            LinkPatch {
                label: Some("Renamed".into()),
                target: Some(" ".into()),
                ..LinkPatch::default()
            },
        )
        .unwrap_err();

        assert!(matches!(err, LinkError::Validation(_)));
        assert_eq!(config.find(&id).unwrap().label, "Docs");
    }

    #[test]
    fn test_edit_clears_icon_with_empty_value() {
        let mut config = Configuration::default();
        let id = add(&mut config, link("Docs", None)).unwrap();
        edit(
            &mut config,
            &id,
            LinkPatch {
                icon: Some(String::new()),
                ..LinkPatch::default()
            },
        )
        .unwrap();
        assert!(config.find(&id).unwrap().icon.is_none());
    }

    #[test]
    fn test_edit_moving_category_keeps_orders_unique() {
        let mut config = Configuration::default();
        add(&mut config, link("Git", Some("Tools"))).unwrap();
        add(&mut config, link("CI", Some("Tools"))).unwrap();
        let mail = add(&mut config, link("Mail", Some("Comms"))).unwrap();

        edit(
            &mut config,
            &mail,
            LinkPatch {
                category: Some("Tools".into()),
                ..LinkPatch::default()
            },
        )
        .unwrap();

        assert_eq!(config.find(&mail).unwrap().category, "Tools");
        assert_eq!(order_of(&config, &mail), 2);
        assert_unique_orders(&config);
    }

    #[test]
    fn test_edit_same_category_keeps_order() {
        let mut config = Configuration::default();
        let a = add(&mut config, link("A", Some("Tools"))).unwrap();
        add(&mut config, link("B", Some("Tools"))).unwrap();
        edit(
            &mut config,
            &a,
            LinkPatch {
                category: Some(" Tools ".into()),
                ..LinkPatch::default()
            },
        )
        .unwrap();
        assert_eq!(order_of(&config, &a), 0);
    }

    #[test]
    fn test_edit_unknown_id_is_not_found() {
        let mut config = Configuration::default();
        let err = edit(&mut config, "nope", LinkPatch::default()).unwrap_err();
        assert!(matches!(err, LinkError::NotFound(id) if id == "nope"));
    }

    #[test]
    fn test_delete_then_edit_is_not_found() {
        let mut config = Configuration::default();
        let id = add(&mut config, link("Docs", None)).unwrap();

        let removed = delete(&mut config, &id).unwrap();
        assert_eq!(removed.label, "Docs");

        let err = edit(
            &mut config,
            &id,
            LinkPatch {
                label: Some("Back".into()),
                ..LinkPatch::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, LinkError::NotFound(_)));
        assert!(matches!(delete(&mut config, &id), Err(LinkError::NotFound(_))));
    }

    #[test]
    fn test_delete_leaves_gaps() {
        let mut config = Configuration::default();
        let a = add(&mut config, link("A", Some("Tools"))).unwrap();
        let b = add(&mut config, link("B", Some("Tools"))).unwrap();
        let c = add(&mut config, link("C", Some("Tools"))).unwrap();

        delete(&mut config, &b).unwrap();
        assert_eq!(order_of(&config, &a), 0);
        assert_eq!(order_of(&config, &c), 2);
    }

    #[test]
    fn test_reorder_shifts_entries_at_or_above_target() {
        let mut config = Configuration::default();
        let first = add(&mut config, link("Git", Some("Tools"))).unwrap();
        let second = add(&mut config, link("CI", Some("Tools"))).unwrap();
        assert_eq!(order_of(&config, &second), 1);

        reorder(&mut config, &first, 1).unwrap();

        assert_eq!(order_of(&config, &first), 1);
        assert_eq!(order_of(&config, &second), 2);
        assert_unique_orders(&config);
        let names: Vec<_> = list(&config)[0].links.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(names, vec!["Git", "CI"]);
    }

    #[test]
    fn test_reorder_to_front() {
        let mut config = Configuration::default();
        let a = add(&mut config, link("A", Some("Tools"))).unwrap();
        let b = add(&mut config, link("B", Some("Tools"))).unwrap();
        let c = add(&mut config, link("C", Some("Tools"))).unwrap();

        reorder(&mut config, &c, 0).unwrap();

        assert_eq!(order_of(&config, &c), 0);
        assert_eq!(order_of(&config, &a), 1);
        assert_eq!(order_of(&config, &b), 2);
        assert_unique_orders(&config);
    }

    #[test]
    fn test_reorder_ignores_other_categories() {
        let mut config = Configuration::default();
        let a = add(&mut config, link("A", Some("Tools"))).unwrap();
        let mail = add(&mut config, link("Mail", Some("Comms"))).unwrap();

        reorder(&mut config, &a, 0).unwrap();
        assert_eq!(order_of(&config, &mail), 0);
    }

    #[test]
    fn test_reorder_separates_hand_edited_duplicates() {
        let mut config = Configuration::default();
        for (id, order) in [("a", 0), ("b", 1), ("c", 1), ("d", 2)] {
            config.links.push(LinkEntry {
                id: id.into(),
                label: id.to_uppercase(),
                target: format!("{id}.html"),
                category: "Tools".into(),
                order,
                description: None,
                icon: None,
            });
        }

        reorder(&mut config, "a", 1).unwrap();

        assert_eq!(order_of(&config, "a"), 1);
        assert_eq!(order_of(&config, "b"), 2);
        assert_eq!(order_of(&config, "c"), 3);
        assert_eq!(order_of(&config, "d"), 4);
        assert_unique_orders(&config);
    }

    fn raw(id: &str, category: &str, order: u32) -> LinkEntry {
        LinkEntry {
            id: id.into(),
            label: id.to_uppercase(),
            target: format!("{id}.html"),
            category: category.into(),
            order,
            description: None,
            icon: None,
        }
    }

    #[test]
    fn test_reorder_past_top_order_is_rejected() {
        let mut config = Configuration::default();
        config.links.push(raw("a", "Tools", 0));
        config.links.push(raw("b", "Tools", u32::MAX));

        let err = reorder(&mut config, "a", u32::MAX).unwrap_err();

        assert!(matches!(err, LinkError::Validation(msg) if msg == "order out of range"));
        assert_eq!(order_of(&config, "a"), 0);
        assert_eq!(order_of(&config, "b"), u32::MAX);
        assert_unique_orders(&config);
    }

    #[test]
    fn test_reorder_cascade_overflow_changes_nothing() {
        let mut config = Configuration::default();
        config.links.push(raw("a", "Tools", 0));
        config.links.push(raw("b", "Tools", u32::MAX - 1));
        config.links.push(raw("c", "Tools", u32::MAX));

        assert!(reorder(&mut config, "a", u32::MAX - 1).is_err());
        assert_eq!(order_of(&config, "a"), 0);
        assert_eq!(order_of(&config, "b"), u32::MAX - 1);
        assert_eq!(order_of(&config, "c"), u32::MAX);
    }

    #[test]
    fn test_add_after_top_order_is_rejected() {
        let mut config = Configuration::default();
        config.links.push(raw("b", "Tools", u32::MAX));

        let err = add(&mut config, link("New", Some("Tools"))).unwrap_err();

        assert!(matches!(err, LinkError::Validation(_)));
        assert_eq!(config.links.len(), 1);
    }

    #[test]
    fn test_edit_into_full_category_is_rejected() {
        let mut config = Configuration::default();
        config.links.push(raw("b", "Tools", u32::MAX));
        config.links.push(raw("m", "Comms", 0));

        let err = edit(
            &mut config,
            "m",
            LinkPatch {
                category: Some("Tools".into()),
                ..LinkPatch::default()
            },
        )
        .unwrap_err();

        assert!(matches!(err, LinkError::Validation(_)));
        assert_eq!(config.find("m").unwrap().category, "Comms");
    }

    #[test]
    fn test_padded_category_groups_with_plain_text() {
        let mut config = Configuration::default();
        config.links.push(raw("a", " Tools", 0));

        let id = add(&mut config, link("CI", Some(" Tools"))).unwrap();

        let groups = list(&config);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Tools");
        assert_eq!(order_of(&config, &id), 1);
        assert_unique_orders(&config);
    }

    #[test]
    fn test_reorder_unknown_id_is_not_found() {
        let mut config = Configuration::default();
        assert!(matches!(
            reorder(&mut config, "missing", 0),
            Err(LinkError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_breaks_order_ties_by_id() {
        let mut config = Configuration::default();
        for id in ["z", "m", "a"] {
            config.links.push(LinkEntry {
                id: id.into(),
                label: id.into(),
                target: "t".into(),
                category: String::new(),
                order: 0,
                description: None,
                icon: None,
            });
        }
        let ids: Vec<_> = list(&config)[0].links.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_list_groups_in_first_seen_order() {
        let mut config = Configuration::default();
        add(&mut config, link("Mail", Some("Comms"))).unwrap();
        add(&mut config, link("Git", Some("Tools"))).unwrap();
        add(&mut config, link("Chat", Some("Comms"))).unwrap();

        let groups = list(&config);
        let names: Vec<_> = groups.iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["Comms", "Tools"]);
        assert_eq!(groups[0].links.len(), 2);
    }

    #[test]
    fn test_format_list() {
        let mut config = Configuration::default();
        assert_eq!(format_list(&config), "No links currently configured.\n");

        let id = add(&mut config, link("Docs", Some("Reference"))).unwrap();
        let text = format_list(&config);
        assert!(text.starts_with("Reference\n"));
        assert!(text.contains("0. Docs"));
        assert!(text.contains(&format!("id: {id}")));
    }

    // ── Session ────────────────────────────────────────────────────────────────

    #[test]
    fn test_session_persists_each_mutation() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("config.json"));
        let mut session = Session::open(store.clone()).unwrap();

        let id = session.add(link("Docs", None)).unwrap();
        assert_eq!(store.load().unwrap().links.len(), 1);

        session.reorder(&id, 4).unwrap();
        assert_eq!(store.load().unwrap().find(&id).unwrap().order, 4);

        session.delete(&id).unwrap();
        assert!(store.load().unwrap().links.is_empty());
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_session_failed_save_keeps_memory_state_for_retry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        // A directory at the config path makes the final rename fail.
        fs::create_dir(&path).unwrap();
        let mut session = Session::with_unsaved(Store::new(&path), Configuration::default());

        let err = session.add(link("Docs", None)).unwrap_err();
        assert!(matches!(err, LinkError::Io { .. }));
        assert!(session.is_dirty());
        assert_eq!(session.config().links.len(), 1);
        assert!(!dir.path().join("config.json.lock").exists());

        fs::remove_dir(&path).unwrap();
        session.save().unwrap();
        assert!(!session.is_dirty());
        assert_eq!(Store::new(&path).load().unwrap().links[0].label, "Docs");
    }

    #[test]
    fn test_session_validation_error_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("config.json"));
        let mut session = Session::open(store.clone()).unwrap();

        let err = session.add(link("", None)).unwrap_err();
        assert!(matches!(err, LinkError::Validation(_)));
        assert!(store.load().unwrap().links.is_empty());
        assert!(!dir.path().join("config.json.lock").exists());
    }

    #[test]
    fn test_session_refreshes_before_mutating() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("config.json"));
        let mut left = Session::open(store.clone()).unwrap();
        let mut right = Session::open(store.clone()).unwrap();

        left.add(link("Left", None)).unwrap();
        right.add(link("Right", None)).unwrap();

        let saved = store.load().unwrap();
        assert_eq!(saved.links.len(), 2);
        assert_eq!(right.config().links.len(), 2);
    }

    #[test]
    fn test_concurrent_adds_lose_nothing() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("config.json"));
        store.load_or_init().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let store = store.clone();
                thread::spawn(move || {
                    let mut session = Session::open(store).unwrap();
                    for i in 0..5 {
                        session.add(link(&format!("L{n}-{i}"), Some("Tools"))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let saved = store.load().unwrap();
        assert_eq!(saved.links.len(), 20);
        let mut ids: Vec<_> = saved.links.iter().map(|l| l.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
        assert_unique_orders(&saved);
    }
}
