//! Menu items and recipes.
//!
//! Recipes are the bridge from what a guest orders to what the kitchen
//! consumes: `expand_lines` turns order lines into ledger requirements.

pub mod item;
pub mod recipe;

pub use item::MenuItem;
pub use recipe::{InMemoryRecipeBook, Recipe, RecipeBook, RecipeComponent, expand_lines};
