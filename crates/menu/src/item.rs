use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_core::{DomainError, DomainResult, Entity, MenuItemId};

/// A dish or drink on the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    id: MenuItemId,
    name: String,
    /// Price in the restaurant's currency.
    price: Decimal,
    description: Option<String>,
    available: bool,
}

impl MenuItem {
    pub fn new(id: MenuItemId, name: impl Into<String>, price: Decimal) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("menu item name cannot be empty"));
        }
        if price < Decimal::ZERO {
            return Err(DomainError::validation("price cannot be negative"));
        }
        Ok(Self {
            id,
            name: name.trim().to_string(),
            price,
            description: None,
            available: true,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.trim().is_empty()).then_some(description);
        self
    }

    pub fn id_typed(&self) -> MenuItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn reprice(&mut self, price: Decimal) -> DomainResult<()> {
        if price < Decimal::ZERO {
            return Err(DomainError::validation("price cannot be negative"));
        }
        self.price = price;
        Ok(())
    }
}

impl Entity for MenuItem {
    type Id = MenuItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn negative_price_is_rejected() {
        assert!(MenuItem::new(MenuItemId::new(), "Soup", dec!(-1)).is_err());
        let mut soup = MenuItem::new(MenuItemId::new(), "Soup", dec!(4.50)).unwrap();
        assert!(soup.reprice(dec!(-0.01)).is_err());
        assert_eq!(soup.price(), dec!(4.5));
    }

    #[test]
    fn blank_description_is_dropped() {
        let soup = MenuItem::new(MenuItemId::new(), "Soup", dec!(4))
            .unwrap()
            .with_description("  ");
        assert_eq!(soup.description(), None);
    }
}
