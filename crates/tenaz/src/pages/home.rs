use super::PageObject;
use crate::action::ActionSpec;
use crate::driver::{ActionOptions, PageDriver};
use crate::locator::Locator;
use crate::pattern::UrlPattern;
use crate::result::TenazResult;
use crate::wait::LoadState;

/// Landing page with the navigation bar and the product grid
#[derive(Debug, Clone)]
pub struct HomePage {
    /// "About" navigation link
    pub about_link: Locator,
    /// "Login" navigation link
    pub login_link: Locator,
    /// "Basket" navigation link
    pub basket_link: Locator,
    /// Header logo
    pub logo: Locator,
    /// Product cards
    pub product_grid: Locator,
    /// "Add to basket" of the first product card
    pub add_to_basket: Locator,
    /// "Browse sweets" button
    pub browse_button: Locator,
    /// Search field, absent on most builds of the shop
    pub search_input: Locator,
}

impl Default for HomePage {
    fn default() -> Self {
        Self::new()
    }
}

impl HomePage {
    /// Create the page object
    #[must_use]
    pub fn new() -> Self {
        Self {
            about_link: Locator::new("#navbarColor01 > ul > li:nth-child(2) > a"),
            login_link: Locator::new("#navbarColor01 > ul > li:nth-child(3) > a"),
            basket_link: Locator::new("#navbarColor01 > ul > li:nth-child(4) > a"),
            logo: Locator::new("body > div > header > div > img"),
            product_grid: Locator::new("div.row.text-center > div.col-lg-3"),
            add_to_basket: Locator::new(
                "body > div > div.row.text-center > div:nth-child(1) > div > div.card-footer > a",
            ),
            browse_button: Locator::new("body > div > header > a"),
            search_input: Locator::new("#search-input-id"),
        }
    }

    /// Open the landing page
    pub async fn navigate(&self, driver: &dyn PageDriver) -> TenazResult<()> {
        driver.goto("/", LoadState::Load).await
    }

    /// Click the login link and land on `/login`
    #[must_use]
    pub fn login_link_action(&self) -> ActionSpec {
        ActionSpec::click(self.login_link.clone())
            .expect_url(UrlPattern::regex("/login"))
            .navigates_to("/login")
    }

    /// Click the basket link and land on `/basket`
    #[must_use]
    pub fn basket_link_action(&self) -> ActionSpec {
        ActionSpec::click(self.basket_link.clone())
            .expect_url(UrlPattern::regex("/basket"))
            .navigates_to("/basket")
    }

    /// Search for `name` and add the first hit to the basket.
    ///
    /// Does nothing and returns `false` when the shop has no search field.
    pub async fn search_product(&self, driver: &dyn PageDriver, name: &str) -> TenazResult<bool> {
        if !driver.is_visible(&self.search_input).await? {
            return Ok(false);
        }
        let options = ActionOptions::default();
        driver.fill(&self.search_input, name, options).await?;
        driver.click(&self.browse_button, options).await?;
        driver.click(&self.add_to_basket, options).await?;
        Ok(true)
    }

    /// Click the product card at `index`
    pub async fn click_product(&self, driver: &dyn PageDriver, index: usize) -> TenazResult<()> {
        let card = self.product_grid.clone().nth(index);
        driver.click(&card, ActionOptions::default()).await
    }

    /// Number of product cards
    pub async fn product_count(&self, driver: &dyn PageDriver) -> TenazResult<usize> {
        driver.count(&self.product_grid).await
    }

    /// Trimmed names of the product cards, empty cards left out
    pub async fn product_names(&self, driver: &dyn PageDriver) -> TenazResult<Vec<String>> {
        let texts = driver.all_text_contents(&self.product_grid).await?;
        Ok(texts
            .iter()
            .map(|text| text.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Click the basket link
    pub async fn go_to_basket(&self, driver: &dyn PageDriver) -> TenazResult<()> {
        driver.click(&self.basket_link, ActionOptions::default()).await
    }

    /// Whether the network went idle within the load budget
    pub async fn is_loaded(&self, driver: &dyn PageDriver) -> bool {
        driver
            .wait_for_load_state(LoadState::NetworkIdle, self.load_timeout())
            .await
            .is_ok()
    }

    /// Click the navigation entry labelled `category`
    pub async fn navigate_to_category(
        &self,
        driver: &dyn PageDriver,
        category: &str,
    ) -> TenazResult<()> {
        let entry = Locator::new("nav a").with_text(category);
        driver.click(&entry, ActionOptions::default()).await
    }
}

impl PageObject for HomePage {
    fn url_pattern(&self) -> UrlPattern {
        UrlPattern::regex(r"^[a-z]+://[^/]+/?(\?.*)?$")
    }
}
