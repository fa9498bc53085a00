//! Page Object Model for the sweet shop.
//!
//! Each page object owns its locators and takes the page context explicitly,
//! so one set of page objects serves any number of pages and drivers.
//! Actions that browsers disagree on are exposed as [`ActionSpec`]s for the
//! [`ResilientActionRunner`] instead of being clicked directly.
//!
//! [`ActionSpec`]: crate::ActionSpec
//! [`ResilientActionRunner`]: crate::ResilientActionRunner

mod basket;
mod home;
mod login;
mod product;

pub use basket::{BasketPage, PaymentDetails, ShippingDetails};
pub use home::HomePage;
pub use login::LoginPage;
pub use product::{ProductPage, QuantityDirection};

use crate::driver::PageDriver;
use crate::pattern::UrlPattern;
use crate::result::TenazResult;
use std::time::Duration;

/// Default time a page gets to finish loading (30 seconds)
pub const DEFAULT_PAGE_LOAD_TIMEOUT_MS: u64 = 30_000;

/// A page or component of the application under test
pub trait PageObject {
    /// Pattern the URL matches while this page is shown
    fn url_pattern(&self) -> UrlPattern;

    /// Name for logs
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Load budget in milliseconds
    fn load_timeout_ms(&self) -> u64 {
        DEFAULT_PAGE_LOAD_TIMEOUT_MS
    }

    /// Load budget
    fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms())
    }
}

/// Whether `driver` currently shows `page`
pub async fn is_current<P>(page: &P, driver: &dyn PageDriver) -> TenazResult<bool>
where
    P: PageObject + Sync + ?Sized,
{
    let url = driver.current_url().await?;
    let current = page.url_pattern().matches(&url);
    tracing::trace!(page = page.page_name(), %url, current, "page check");
    Ok(current)
}
