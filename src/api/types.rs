use serde::Deserialize;

use crate::util::id_from_resource_url;

// ============================================================================
// Shared Shapes
// ============================================================================

/// `{ name, url }` pair used throughout the API for references.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

// ============================================================================
// Catalog Index
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct CatalogPage {
    pub(crate) results: Vec<NamedResource>,
}

/// One row of the catalog index.
///
/// `id` comes from the trailing path segment of `resource_url`; an entry whose
/// URL cannot be parsed gets id 0, which belongs to no category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    pub resource_url: String,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, resource_url: impl Into<String>) -> Self {
        let resource_url = resource_url.into();
        let id = id_from_resource_url(&resource_url).unwrap_or(0);
        Self {
            id,
            name: name.into(),
            resource_url,
        }
    }
}

impl From<NamedResource> for CatalogEntry {
    fn from(r: NamedResource) -> Self {
        Self::new(r.name, r.url)
    }
}

// ============================================================================
// Category Membership
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryResponse {
    #[serde(default)]
    pub(crate) pokemon: Vec<CategoryMember>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryMember {
    pub(crate) pokemon: NamedResource,
}

// ============================================================================
// Detail Record
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Sprites {
    pub front_default: Option<String>,
    #[serde(default)]
    pub other: Option<OtherSprites>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork", default)]
    pub official_artwork: Option<ArtworkSprites>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArtworkSprites {
    pub front_default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TypeSlot {
    pub slot: u8,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AbilitySlot {
    pub ability: NamedResource,
    #[serde(default)]
    pub is_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatValue {
    pub base_stat: u32,
    pub stat: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MoveEntry {
    #[serde(rename = "move")]
    pub move_ref: NamedResource,
}

/// Full record for one entry, fetched on demand and never cached.
///
/// Height is in decimetres and weight in hectograms, as served.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DetailRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub base_experience: Option<u32>,
    #[serde(default)]
    pub sprites: Sprites,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub abilities: Vec<AbilitySlot>,
    #[serde(default)]
    pub stats: Vec<StatValue>,
    #[serde(default)]
    pub moves: Vec<MoveEntry>,
    #[serde(default)]
    pub forms: Vec<NamedResource>,
}

impl DetailRecord {
    /// Official artwork, falling back to the default front sprite.
    pub fn artwork_url(&self) -> Option<&str> {
        self.sprites
            .other
            .as_ref()
            .and_then(|o| o.official_artwork.as_ref())
            .and_then(|a| a.front_default.as_deref())
            .or(self.sprites.front_default.as_deref())
    }

    pub fn height_m(&self) -> f64 {
        f64::from(self.height) / 10.0
    }

    pub fn weight_kg(&self) -> f64 {
        f64::from(self.weight) / 10.0
    }
}

/// The slice of a detail record shown in the favorites grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSummary {
    pub id: i64,
    pub name: String,
    pub sprite_url: Option<String>,
}

impl CardSummary {
    /// Card for the id that was requested. The record's own id is ignored,
    /// so a card always matches the favorite it was resolved for.
    pub fn for_requested(id: i64, record: DetailRecord) -> Self {
        Self {
            id,
            name: record.name,
            sprite_url: record.sprites.front_default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_entry_parses_id() {
        let e = CatalogEntry::new("pikachu", "https://pokeapi.co/api/v2/pokemon/25/");
        assert_eq!(e.id, 25);
    }

    #[test]
    fn catalog_entry_bad_url_gets_zero() {
        let e = CatalogEntry::new("missingno", "https://pokeapi.co/api/v2/pokemon/");
        assert_eq!(e.id, 0);
    }

    #[test]
    fn detail_decodes_minimal_record() {
        let json = r#"{"id": 132, "name": "ditto"}"#;
        let d: DetailRecord = serde_json::from_str(json).unwrap();
        assert_eq!(d.id, 132);
        assert!(d.types.is_empty());
        assert_eq!(d.base_experience, None);
        assert_eq!(d.artwork_url(), None);
    }

    #[test]
    fn detail_artwork_prefers_official() {
        let json = r#"{
            "id": 25, "name": "pikachu", "height": 4, "weight": 60,
            "base_experience": 112,
            "sprites": {
                "front_default": "https://img/front/25.png",
                "other": {"official-artwork": {"front_default": "https://img/art/25.png"}}
            },
            "types": [{"slot": 1, "type": {"name": "electric", "url": "https://pokeapi.co/api/v2/type/13/"}}],
            "abilities": [{"ability": {"name": "static", "url": "u"}, "is_hidden": false}],
            "stats": [{"base_stat": 35, "stat": {"name": "hp", "url": "u"}}],
            "moves": [{"move": {"name": "thunder-shock", "url": "u"}}],
            "forms": [{"name": "pikachu", "url": "u"}]
        }"#;
        let d: DetailRecord = serde_json::from_str(json).unwrap();
        assert_eq!(d.artwork_url(), Some("https://img/art/25.png"));
        assert!((d.height_m() - 0.4).abs() < f64::EPSILON);
        assert!((d.weight_kg() - 6.0).abs() < f64::EPSILON);
        assert_eq!(d.types[0].kind.name, "electric");
        assert_eq!(d.moves[0].move_ref.name, "thunder-shock");
    }

    #[test]
    fn detail_artwork_falls_back_to_front() {
        let json = r#"{"id": 1, "name": "bulbasaur",
            "sprites": {"front_default": "https://img/front/1.png", "other": {}}}"#;
        let d: DetailRecord = serde_json::from_str(json).unwrap();
        assert_eq!(d.artwork_url(), Some("https://img/front/1.png"));
    }

    #[test]
    fn card_summary_uses_requested_id() {
        let json = r#"{"id": 4, "name": "charmander", "sprites": {"front_default": "s"}}"#;
        let d: DetailRecord = serde_json::from_str(json).unwrap();
        let card = CardSummary::for_requested(10_004, d);
        assert_eq!(card.id, 10_004);
        assert_eq!(card.name, "charmander");
        assert_eq!(card.sprite_url.as_deref(), Some("s"));
    }
}
