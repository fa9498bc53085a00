use super::PageObject;
use crate::driver::{ActionOptions, PageDriver};
use crate::locator::Locator;
use crate::pattern::UrlPattern;
use crate::result::TenazResult;
use crate::wait::ElementState;

/// Which quantity button to press
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuantityDirection {
    /// The `+` button
    #[default]
    Increase,
    /// The `-` button
    Decrease,
}

/// Product detail card
#[derive(Debug, Clone)]
pub struct ProductPage {
    /// Product name heading
    pub title: Locator,
    /// Price label
    pub price: Locator,
    /// Description paragraph
    pub description: Locator,
    /// Product image
    pub image: Locator,
    /// "Add to basket" button
    pub add_to_cart_button: Locator,
    /// Quantity input
    pub quantity_input: Locator,
    /// `+` button
    pub increase_button: Locator,
    /// `-` button
    pub decrease_button: Locator,
    /// Back link
    pub back_button: Locator,
}

impl Default for ProductPage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductPage {
    /// Create the page object
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: Locator::new(".card-body h4").first(),
            price: Locator::new(".card-body .text-muted, .card-body small").first(),
            description: Locator::new(".card-text").first(),
            image: Locator::new(".card img").first(),
            add_to_cart_button: Locator::new("button.addItem, a.addItem").first(),
            quantity_input: Locator::new("input[type=\"number\"], input[name*=\"quantity\"]"),
            increase_button: Locator::new("button").with_text("+"),
            decrease_button: Locator::new("button").with_text("-"),
            back_button: Locator::new("a, button").with_text("Back"),
        }
    }

    /// Trimmed product name, empty when missing
    pub async fn title(&self, driver: &dyn PageDriver) -> TenazResult<String> {
        trimmed_text(driver, &self.title).await
    }

    /// Trimmed price label, empty when missing
    pub async fn price(&self, driver: &dyn PageDriver) -> TenazResult<String> {
        trimmed_text(driver, &self.price).await
    }

    /// Trimmed description, empty when missing
    pub async fn description(&self, driver: &dyn PageDriver) -> TenazResult<String> {
        trimmed_text(driver, &self.description).await
    }

    /// Wait for the button, then add the product to the basket
    pub async fn add_to_cart(&self, driver: &dyn PageDriver) -> TenazResult<()> {
        driver
            .wait_for(&self.add_to_cart_button, ElementState::Visible, self.load_timeout())
            .await?;
        driver
            .click(&self.add_to_cart_button, ActionOptions::default())
            .await
    }

    /// Type `quantity` into the quantity input
    pub async fn set_quantity(&self, driver: &dyn PageDriver, quantity: i64) -> TenazResult<()> {
        driver
            .fill(&self.quantity_input, &quantity.to_string(), ActionOptions::default())
            .await
    }

    /// Press `+` or `-` `times` times
    pub async fn adjust_quantity(
        &self,
        driver: &dyn PageDriver,
        times: u32,
        direction: QuantityDirection,
    ) -> TenazResult<()> {
        let button = match direction {
            QuantityDirection::Increase => &self.increase_button,
            QuantityDirection::Decrease => &self.decrease_button,
        };
        for _ in 0..times {
            driver.click(button, ActionOptions::default()).await?;
        }
        Ok(())
    }

    /// Quantity shown in the input; `1` when it is empty, zero or not a number
    pub async fn quantity(&self, driver: &dyn PageDriver) -> TenazResult<i64> {
        let value = driver.input_value(&self.quantity_input).await?;
        Ok(leading_integer(&value).filter(|n| *n != 0).unwrap_or(1))
    }

    /// Whether "Add to basket" is enabled
    pub async fn is_add_to_cart_enabled(&self, driver: &dyn PageDriver) -> TenazResult<bool> {
        driver.is_enabled(&self.add_to_cart_button).await
    }

    /// Whether the image is shown and actually decoded
    pub async fn is_image_visible(&self, driver: &dyn PageDriver) -> TenazResult<bool> {
        if !driver.is_visible(&self.image).await? {
            return Ok(false);
        }
        let loaded = driver
            .evaluate_on(&self.image, "img => img.complete && img.naturalWidth > 0")
            .await?;
        Ok(loaded.as_bool().unwrap_or(false))
    }

    /// Click the back link
    pub async fn go_back(&self, driver: &dyn PageDriver) -> TenazResult<()> {
        driver.click(&self.back_button, ActionOptions::default()).await
    }
}

impl PageObject for ProductPage {
    fn url_pattern(&self) -> UrlPattern {
        UrlPattern::contains("/sweets")
    }
}

async fn trimmed_text(driver: &dyn PageDriver, locator: &Locator) -> TenazResult<String> {
    let text = driver.text_content(locator).await?;
    Ok(text.as_deref().map(str::trim).unwrap_or_default().to_string())
}

/// Integer prefix of `value` after leading whitespace, like `parseInt(value, 10)`
fn leading_integer(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let digits_start = usize::from(value.starts_with(['+', '-']));
    let digits_end = value[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(value.len(), |i| i + digits_start);
    if digits_end == digits_start {
        return None;
    }
    value[..digits_end].parse().ok()
}
