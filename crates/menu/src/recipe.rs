use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use larder_core::{DomainError, DomainResult, IngredientId, MenuItemId, Quantity, ValueObject};
use larder_inventory::Requirement;

/// Amount of one ingredient used by a single portion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeComponent {
    pub ingredient_id: IngredientId,
    pub quantity: Quantity,
}

impl ValueObject for RecipeComponent {}

/// Fixed ingredient list for one portion of a menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    menu_item_id: MenuItemId,
    components: Vec<RecipeComponent>,
}

impl Recipe {
    pub fn new(menu_item_id: MenuItemId, components: Vec<RecipeComponent>) -> DomainResult<Self> {
        if components.is_empty() {
            return Err(DomainError::validation("recipe needs at least one ingredient"));
        }
        for (i, c) in components.iter().enumerate() {
            if c.quantity.is_zero() {
                return Err(DomainError::validation("recipe quantities must be positive"));
            }
            if components[..i].iter().any(|p| p.ingredient_id == c.ingredient_id) {
                return Err(DomainError::validation(format!(
                    "ingredient {} listed twice",
                    c.ingredient_id
                )));
            }
        }
        Ok(Self {
            menu_item_id,
            components,
        })
    }

    pub fn menu_item_id(&self) -> MenuItemId {
        self.menu_item_id
    }

    pub fn components(&self) -> &[RecipeComponent] {
        &self.components
    }
}

/// Source of recipes, supplied by the surrounding application.
pub trait RecipeBook: Send + Sync {
    fn recipe_for(&self, menu_item_id: MenuItemId) -> Option<Recipe>;
}

impl<B> RecipeBook for Arc<B>
where
    B: RecipeBook + ?Sized,
{
    fn recipe_for(&self, menu_item_id: MenuItemId) -> Option<Recipe> {
        (**self).recipe_for(menu_item_id)
    }
}

/// In-memory recipe book for tests/dev.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecipeBook {
    recipes: HashMap<MenuItemId, Recipe>,
}

impl InMemoryRecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the recipe of its menu item.
    pub fn insert(&mut self, recipe: Recipe) {
        self.recipes.insert(recipe.menu_item_id, recipe);
    }

    pub fn with(mut self, recipe: Recipe) -> Self {
        self.insert(recipe);
        self
    }
}

impl RecipeBook for InMemoryRecipeBook {
    fn recipe_for(&self, menu_item_id: MenuItemId) -> Option<Recipe> {
        self.recipes.get(&menu_item_id).cloned()
    }
}

/// Expand `(menu item, portions)` lines into ledger requirements.
///
/// Each recipe component is scaled by the portion count. A line whose menu
/// item has no recipe, with zero portions, or whose scaled amount overflows
/// is rejected.
pub fn expand_lines<B>(
    book: &B,
    lines: impl IntoIterator<Item = (MenuItemId, u32)>,
) -> DomainResult<Vec<Requirement>>
where
    B: RecipeBook + ?Sized,
{
    let mut requirements = Vec::new();
    for (menu_item_id, portions) in lines {
        if portions == 0 {
            return Err(DomainError::validation("portions must be positive"));
        }
        let recipe = book
            .recipe_for(menu_item_id)
            .ok_or_else(|| DomainError::not_found(format!("recipe for menu item {menu_item_id}")))?;

        for c in &recipe.components {
            let quantity = c.quantity.checked_mul(portions).ok_or_else(|| {
                DomainError::validation(format!(
                    "{portions} portions of menu item {menu_item_id} overflow the quantity range"
                ))
            })?;
            requirements.push(Requirement {
                ingredient_id: c.ingredient_id,
                menu_item_id,
                quantity,
            });
        }
    }
    Ok(requirements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn grams(n: u32) -> Quantity {
        Quantity::new(rust_decimal::Decimal::from(n) / dec!(1000)).unwrap()
    }

    #[test]
    fn expands_portions_per_component() {
        let pizza = MenuItemId::new();
        let flour = IngredientId::new();
        let cheese = IngredientId::new();
        let book = InMemoryRecipeBook::new().with(
            Recipe::new(
                pizza,
                vec![
                    RecipeComponent { ingredient_id: flour, quantity: grams(250) },
                    RecipeComponent { ingredient_id: cheese, quantity: grams(120) },
                ],
            )
            .unwrap(),
        );

        let reqs = expand_lines(&book, [(pizza, 2)]).unwrap();

        assert_eq!(
            reqs,
            vec![
                Requirement { ingredient_id: flour, menu_item_id: pizza, quantity: grams(500) },
                Requirement { ingredient_id: cheese, menu_item_id: pizza, quantity: grams(240) },
            ]
        );
    }

    #[test]
    fn missing_recipe_is_not_found() {
        let book = InMemoryRecipeBook::new();
        let err = expand_lines(&book, [(MenuItemId::new(), 1)]).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn overflowing_portions_are_rejected() {
        let stew = MenuItemId::new();
        let book = InMemoryRecipeBook::new().with(
            Recipe::new(
                stew,
                vec![RecipeComponent {
                    ingredient_id: IngredientId::new(),
                    quantity: Quantity::new(rust_decimal::Decimal::MAX).unwrap(),
                }],
            )
            .unwrap(),
        );

        let err = expand_lines(&book, [(stew, 2)]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(expand_lines(&book, [(stew, 1)]).is_ok());
    }

    #[test]
    fn recipe_rejects_duplicates_and_zero_amounts() {
        let flour = IngredientId::new();
        let twice = Recipe::new(
            MenuItemId::new(),
            vec![
                RecipeComponent { ingredient_id: flour, quantity: grams(1) },
                RecipeComponent { ingredient_id: flour, quantity: grams(2) },
            ],
        );
        assert!(twice.is_err());

        let zero = Recipe::new(
            MenuItemId::new(),
            vec![RecipeComponent { ingredient_id: flour, quantity: Quantity::ZERO }],
        );
        assert!(zero.is_err());
    }

    #[test]
    fn works_through_a_shared_book() {
        let soup = MenuItemId::new();
        let stock = IngredientId::new();
        let book: Arc<dyn RecipeBook> = Arc::new(InMemoryRecipeBook::new().with(
            Recipe::new(soup, vec![RecipeComponent { ingredient_id: stock, quantity: grams(300) }])
                .unwrap(),
        ));

        let reqs = expand_lines(&book, [(soup, 3)]).unwrap();
        assert_eq!(reqs[0].quantity, grams(900));
    }
}
