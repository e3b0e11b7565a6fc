//! Process-wide widget state, restored from and seeded into the durable store

use crate::catalog::{HeroCatalog, MatchupTable};
use crate::error::StoreError;
use crate::geometry::{default_rect, GeometryMap, Rect, WindowId};
use crate::store::{
    DurableStore, DEFAULT_HERO, KEY_IS_VISIBLE, KEY_SELECTED_HERO, KEY_USERNAME,
    KEY_WINDOW_POSITIONS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub username: Option<String>,
    pub selected_hero: String,
    pub is_visible: bool,
    /// Holds every tracked window; Settings is never in here
    pub window_geometry: GeometryMap,
    /// Static matchup table, read once per session
    pub matchups: MatchupTable,
    /// Tank list merged with matchups, once the stats service answered
    pub catalog: Option<HeroCatalog>,
}

impl AppState {
    /// Read the persisted state, writing first-run defaults for anything
    /// missing. An empty hero name counts as unset.
    pub fn load(store: &DurableStore, work_area: Rect) -> Result<Self, StoreError> {
        let selected_hero = match store.get_opt::<String>(KEY_SELECTED_HERO) {
            Some(hero) if !hero.is_empty() => hero,
            _ => {
                store.set(KEY_SELECTED_HERO, DEFAULT_HERO)?;
                DEFAULT_HERO.to_string()
            }
        };

        let is_visible = match store.get_opt::<bool>(KEY_IS_VISIBLE) {
            Some(visible) => visible,
            None => {
                store.set(KEY_IS_VISIBLE, false)?;
                false
            }
        };

        let persisted: GeometryMap = store.get(KEY_WINDOW_POSITIONS, GeometryMap::new());
        let window_geometry: GeometryMap = WindowId::TRACKED
            .iter()
            .map(|&id| {
                let rect = persisted
                    .get(&id)
                    .copied()
                    .filter(Rect::is_valid)
                    .unwrap_or_else(|| default_rect(id, work_area));
                (id, rect)
            })
            .collect();
        if window_geometry != persisted {
            tracing::info!("Seeding window positions for first run");
            store.set(KEY_WINDOW_POSITIONS, &window_geometry)?;
        }

        let username = store
            .get_opt::<String>(KEY_USERNAME)
            .filter(|name| !name.trim().is_empty());

        Ok(AppState {
            username,
            selected_hero,
            is_visible,
            window_geometry,
            matchups: MatchupTable::new(),
            catalog: None,
        })
    }
}
