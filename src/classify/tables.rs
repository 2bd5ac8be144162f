//! Static OSM tag filters and NAICS code tables

use crate::provider::TagFilter;

/// Tags searched in the retail pass
pub const RETAIL_TAGS: &[TagFilter] = &[
    ("shop", "supermarket"),
    ("shop", "grocery"),
    ("shop", "convenience"),
    ("shop", "greengrocer"),
    ("shop", "organic"),
    ("shop", "dairy"),
    ("shop", "cheese"),
    ("shop", "chocolate"),
    ("shop", "confectionery"),
    ("shop", "butcher"),
    ("shop", "florist"),
    ("shop", "cosmetics"),
    ("shop", "perfumery"),
    ("shop", "beauty"),
    ("shop", "chemist"),
    ("shop", "health_food"),
    ("shop", "department_store"),
    ("shop", "general"),
    ("shop", "variety_store"),
    ("shop", "alcohol"),
    ("shop", "beverages"),
    ("shop", "wine"),
    ("shop", "beer"),
    ("shop", "tobacco"),
];

/// Tags searched in the wholesale pass
pub const WHOLESALE_TAGS: &[TagFilter] = &[
    ("shop", "wholesale"),
    ("wholesale", "food"),
    ("wholesale", "groceries"),
    ("wholesale", "beverages"),
    ("wholesale", "alcohol"),
    ("wholesale", "wine"),
    ("wholesale", "beer"),
    ("wholesale", "fruit"),
    ("wholesale", "vegetables"),
    ("wholesale", "meat"),
    ("wholesale", "seafood"),
    ("wholesale", "dairy"),
    ("wholesale", "cosmetics"),
    ("wholesale", "health_products"),
    ("wholesale", "chemicals"),
];

/// Retail NAICS codes keyed by `shop=` value
const RETAIL_NAICS: &[(&str, &str)] = &[
    ("supermarket", "445110"),
    ("grocery", "445110"),
    ("organic", "445110"),
    ("convenience", "445120"),
    ("greengrocer", "445230"),
    ("dairy", "445299"),
    ("cheese", "445299"),
    ("chocolate", "445292"),
    ("confectionery", "445292"),
    ("butcher", "445210"),
    ("florist", "453110"),
    ("cosmetics", "446120"),
    ("perfumery", "446120"),
    ("beauty", "446120"),
    ("chemist", "446110"),
    ("health_food", "446191"),
    ("department_store", "452210"),
    ("general", "452319"),
    ("variety_store", "452319"),
    ("alcohol", "445310"),
    ("beverages", "445310"),
    ("wine", "445310"),
    ("beer", "445310"),
    ("tobacco", "453991"),
];

/// Wholesale keywords in match order; the first hit decides the code
pub const WHOLESALE_KEYWORD_NAICS: &[(&str, &str)] = &[
    ("frozen", "424420"),
    ("dairy", "424430"),
    ("seafood", "424460"),
    ("fish", "424460"),
    ("meat", "424470"),
    ("poultry", "424470"),
    ("fruit", "424480"),
    ("vegetable", "424480"),
    ("produce", "424480"),
    ("grocery", "424410"),
    ("general line", "424410"),
    ("food service", "424410"),
    ("beverage", "424490"),
    ("alcohol", "424820"),
    ("wine", "424820"),
    ("beer", "424810"),
    ("cosmetic", "424210"),
    ("health", "424210"),
    ("chemical", "424690"),
];

/// Code used for wholesale records when no keyword matches
pub const DEFAULT_WHOLESALE_NAICS: &str = "424490";

/// Phrases that mark an establishment as wholesale regardless of its tags
pub const WHOLESALE_SIGNALS: &[&str] = &["wholesale", "distributor", "merchant wholesaler"];

/// Looks up the retail NAICS code for a `shop=` value
pub fn retail_naics(shop_value: &str) -> Option<&'static str> {
    RETAIL_NAICS
        .iter()
        .find(|(value, _)| *value == shop_value)
        .map(|(_, code)| *code)
}

/// Returns the code of the first wholesale keyword found in `text`
pub fn wholesale_naics(text: &str) -> Option<&'static str> {
    WHOLESALE_KEYWORD_NAICS
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|(_, code)| *code)
}
