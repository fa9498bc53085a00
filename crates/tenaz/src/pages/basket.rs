use super::PageObject;
use crate::action::ActionSpec;
use crate::driver::{ActionOptions, PageDriver};
use crate::locator::Locator;
use crate::pattern::UrlPattern;
use crate::result::TenazResult;
use crate::wait::{ElementState, LoadState};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long `is_empty` waits for the "Empty Basket" link
const EMPTY_CHECK_TIMEOUT: Duration = Duration::from_millis(2_000);

/// Billing address of the checkout form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Email
    pub email: String,
    /// Address
    pub address: String,
    /// Second address line, left untouched when `None`
    #[serde(default)]
    pub address2: Option<String>,
    /// Country option
    pub country: String,
    /// City option
    pub city: String,
    /// Zip code
    pub zip: String,
}

/// Card details of the checkout form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// Name on card
    pub card_holder: String,
    /// Card number
    pub card_number: String,
    /// Expiration
    pub expiration: String,
    /// CVV
    pub cvv: String,
}

/// Basket summary plus the checkout form
#[derive(Debug, Clone)]
pub struct BasketPage {
    /// First basket line
    pub items: Locator,
    /// Total price
    pub total: Locator,
    /// Name of the first item
    pub item_name: Locator,
    /// Quantity of the second line
    pub item_quantity: Locator,
    /// Item counter in the navigation bar
    pub item_count_badge: Locator,
    /// Delete link of the second line
    pub delete_item_link: Locator,
    /// "Empty Basket" link
    pub empty_basket_link: Locator,
    /// Delivery option label
    pub delivery_option: Locator,
    /// Promo code input
    pub promo_code_input: Locator,
    /// Promo code redeem button
    pub promo_code_redeem: Locator,
    /// First name input
    pub first_name_input: Locator,
    /// Last name input
    pub last_name_input: Locator,
    /// Email input
    pub email_input: Locator,
    /// Address input
    pub address_input: Locator,
    /// Second address line input
    pub address2_input: Locator,
    /// Country select
    pub country_select: Locator,
    /// City select
    pub city_select: Locator,
    /// Zip input
    pub zip_input: Locator,
    /// Name on card input
    pub card_holder_input: Locator,
    /// Card number input
    pub card_number_input: Locator,
    /// Expiration input
    pub expiration_input: Locator,
    /// CVV input
    pub cvv_input: Locator,
    /// "Continue to checkout" button
    pub continue_button: Locator,
}

impl Default for BasketPage {
    fn default() -> Self {
        Self::new()
    }
}

impl BasketPage {
    /// Create the page object
    #[must_use]
    pub fn new() -> Self {
        let summary = "body > div > div > div.col-md-4.order-md-2.mb-4";
        Self {
            items: Locator::new("#basketItems > li:nth-child(1)"),
            total: Locator::new("#basketItems > li:nth-child(3) > strong"),
            item_name: Locator::new("#basketItems > li:nth-child(1) > div > h6"),
            item_quantity: Locator::new("#basketItems > li:nth-child(2) > div > small"),
            item_count_badge: Locator::new("#basketCount"),
            delete_item_link: Locator::new("#basketItems > li:nth-child(2) > div > a"),
            empty_basket_link: Locator::new(format!("{summary} > form > div:nth-child(2) > a")),
            delivery_option: Locator::new(format!("{summary} > div > div:nth-child(1) > label")),
            promo_code_input: Locator::new(format!("{summary} > form > div:nth-child(1) > input")),
            promo_code_redeem: Locator::new(format!(
                "{summary} > form > div:nth-child(1) > div:nth-child(3) > button"
            )),
            first_name_input: Locator::new("#name"),
            last_name_input: Locator::new("#lastName"),
            email_input: Locator::new("#email"),
            address_input: Locator::new("#address"),
            address2_input: Locator::new("#address2"),
            country_select: Locator::new("#country"),
            city_select: Locator::new("#city"),
            zip_input: Locator::new("#zip"),
            card_holder_input: Locator::new("#cc-name"),
            card_number_input: Locator::new("#cc-number"),
            expiration_input: Locator::new("#cc-expiration"),
            cvv_input: Locator::new("#cc-cvv"),
            continue_button: Locator::new("body > div > div > div.col-md-8.order-md-1 > form > button"),
        }
    }

    /// Open `/basket`
    pub async fn navigate(&self, driver: &dyn PageDriver) -> TenazResult<()> {
        driver.goto("/basket", LoadState::Load).await
    }

    /// Number of matching basket lines
    pub async fn item_count(&self, driver: &dyn PageDriver) -> TenazResult<usize> {
        driver.count(&self.items).await
    }

    /// Total label, `"0"` when missing
    pub async fn total(&self, driver: &dyn PageDriver) -> TenazResult<String> {
        text_or(driver, &self.total, "0").await
    }

    /// Whether the basket is empty, judged by the "Empty Basket" link not showing up
    pub async fn is_empty(&self, driver: &dyn PageDriver) -> TenazResult<bool> {
        match driver
            .wait_for(&self.empty_basket_link, ElementState::Visible, EMPTY_CHECK_TIMEOUT)
            .await
        {
            Ok(()) => Ok(false),
            Err(e) if e.is_lifecycle() => Err(e),
            Err(_) => Ok(true),
        }
    }

    /// Click "Empty Basket"
    pub async fn empty_basket(&self, driver: &dyn PageDriver) -> TenazResult<()> {
        driver
            .click(&self.empty_basket_link, ActionOptions::default())
            .await
    }

    /// Pick the first delivery option
    pub async fn choose_delivery(&self, driver: &dyn PageDriver) -> TenazResult<()> {
        driver.click(&self.delivery_option, ActionOptions::default()).await
    }

    /// Enter and redeem a promo code
    pub async fn apply_promo_code(&self, driver: &dyn PageDriver, code: &str) -> TenazResult<()> {
        let options = ActionOptions::default();
        driver.fill(&self.promo_code_input, code, options).await?;
        driver.click(&self.promo_code_redeem, options).await
    }

    /// Fill the billing address
    pub async fn fill_shipping(&self, driver: &dyn PageDriver, details: &ShippingDetails) -> TenazResult<()> {
        let options = ActionOptions::default();
        driver.fill(&self.first_name_input, &details.first_name, options).await?;
        driver.fill(&self.last_name_input, &details.last_name, options).await?;
        driver.fill(&self.email_input, &details.email, options).await?;
        driver.fill(&self.address_input, &details.address, options).await?;
        if let Some(address2) = &details.address2 {
            driver.fill(&self.address2_input, address2, options).await?;
        }
        driver.select_option(&self.country_select, &details.country).await?;
        driver.select_option(&self.city_select, &details.city).await?;
        driver.fill(&self.zip_input, &details.zip, options).await
    }

    /// Fill the card details
    pub async fn fill_payment(&self, driver: &dyn PageDriver, details: &PaymentDetails) -> TenazResult<()> {
        let options = ActionOptions::default();
        driver.fill(&self.card_holder_input, &details.card_holder, options).await?;
        driver.fill(&self.card_number_input, &details.card_number, options).await?;
        driver.fill(&self.expiration_input, &details.expiration, options).await?;
        driver.fill(&self.cvv_input, &details.cvv, options).await
    }

    /// Submit the checkout form
    #[must_use]
    pub fn continue_checkout_action(&self) -> ActionSpec {
        ActionSpec::click(self.continue_button.clone())
    }

    /// Name of the first item, empty when missing
    pub async fn item_name(&self, driver: &dyn PageDriver) -> TenazResult<String> {
        text_or(driver, &self.item_name, "").await
    }

    /// Quantity label, empty when missing
    pub async fn item_quantity(&self, driver: &dyn PageDriver) -> TenazResult<String> {
        text_or(driver, &self.item_quantity, "").await
    }

    /// Click the delete link of the item line
    pub async fn delete_item(&self, driver: &dyn PageDriver) -> TenazResult<()> {
        driver
            .click(&self.delete_item_link, ActionOptions::default())
            .await
    }

    /// Navigation bar item counter, `"0"` when missing
    pub async fn total_item_count(&self, driver: &dyn PageDriver) -> TenazResult<String> {
        text_or(driver, &self.item_count_badge, "0").await
    }
}

impl PageObject for BasketPage {
    fn url_pattern(&self) -> UrlPattern {
        UrlPattern::regex("/basket")
    }
}

async fn text_or(driver: &dyn PageDriver, locator: &Locator, fallback: &str) -> TenazResult<String> {
    let text = driver.text_content(locator).await?;
    Ok(text.filter(|t| !t.is_empty()).unwrap_or_else(|| fallback.to_string()))
}
