use super::PageObject;
use crate::action::ActionSpec;
use crate::driver::{ActionOptions, PageDriver};
use crate::locator::Locator;
use crate::pattern::UrlPattern;
use crate::result::TenazResult;
use crate::wait::LoadState;

/// Login form with email, password and the social login options
#[derive(Debug, Clone)]
pub struct LoginPage {
    /// Email input
    pub email_input: Locator,
    /// Password input
    pub password_input: Locator,
    /// Submit button
    pub submit_button: Locator,
    /// Social login images, in page order
    pub alternative_logins: [Locator; 3],
    /// Collapsed navigation toggle on narrow viewports
    pub menu_toggle: Locator,
}

impl Default for LoginPage {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginPage {
    /// Create the page object
    #[must_use]
    pub fn new() -> Self {
        let social = |n: usize| {
            Locator::new(format!("body > div > div > div > div > a:nth-child({n}) > img"))
        };
        Self {
            email_input: Locator::new("#exampleInputEmail"),
            password_input: Locator::new("#exampleInputPassword"),
            submit_button: Locator::new("form button[type=\"submit\"], form button").first(),
            alternative_logins: [social(1), social(2), social(3)],
            menu_toggle: Locator::new("body > nav > div > button > span"),
        }
    }

    /// Open `/login`
    pub async fn navigate(&self, driver: &dyn PageDriver) -> TenazResult<()> {
        driver.goto("/login", LoadState::Load).await
    }

    /// Fill both fields and submit
    pub async fn login(&self, driver: &dyn PageDriver, email: &str, password: &str) -> TenazResult<()> {
        self.fill_email(driver, email).await?;
        self.fill_password(driver, password).await?;
        driver.click(&self.submit_button, ActionOptions::default()).await
    }

    /// Submit the form
    #[must_use]
    pub fn submit_action(&self) -> ActionSpec {
        ActionSpec::click(self.submit_button.clone())
    }

    /// Click social login option `option` (1 to 3, anything else picks 1)
    pub async fn click_alternative_login(&self, driver: &dyn PageDriver, option: usize) -> TenazResult<()> {
        let index = match option {
            1..=3 => option - 1,
            _ => 0,
        };
        driver
            .click(&self.alternative_logins[index], ActionOptions::default())
            .await
    }

    /// Whether the email input is shown
    pub async fn is_login_form_visible(&self, driver: &dyn PageDriver) -> TenazResult<bool> {
        driver.is_visible(&self.email_input).await
    }

    /// Current email value
    pub async fn email_value(&self, driver: &dyn PageDriver) -> TenazResult<String> {
        driver.input_value(&self.email_input).await
    }

    /// Current password value
    pub async fn password_value(&self, driver: &dyn PageDriver) -> TenazResult<String> {
        driver.input_value(&self.password_input).await
    }

    /// Clear the email input
    pub async fn clear_email(&self, driver: &dyn PageDriver) -> TenazResult<()> {
        driver.clear(&self.email_input, ActionOptions::default()).await
    }

    /// Clear the password input
    pub async fn clear_password(&self, driver: &dyn PageDriver) -> TenazResult<()> {
        driver.clear(&self.password_input, ActionOptions::default()).await
    }

    /// Type into the email input
    pub async fn fill_email(&self, driver: &dyn PageDriver, email: &str) -> TenazResult<()> {
        driver.fill(&self.email_input, email, ActionOptions::default()).await
    }

    /// Type into the password input
    pub async fn fill_password(&self, driver: &dyn PageDriver, password: &str) -> TenazResult<()> {
        driver
            .fill(&self.password_input, password, ActionOptions::default())
            .await
    }
}

impl PageObject for LoginPage {
    fn url_pattern(&self) -> UrlPattern {
        UrlPattern::regex("/login")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement, MockOp};

    fn login_form() -> (MockDriver, LoginPage) {
        let driver = MockDriver::new()
            .with_base_url("https://sweetshop.netlify.app")
            .with_url("https://sweetshop.netlify.app/login");
        let page = LoginPage::new();
        driver.add_element(&page.email_input, MockElement::visible());
        driver.add_element(&page.password_input, MockElement::visible());
        driver.add_element(&page.submit_button, MockElement::visible());
        for option in &page.alternative_logins {
            driver.add_element(option, MockElement::visible());
        }
        (driver, page)
    }

    #[tokio::test]
    async fn test_login_fills_and_submits() {
        let (driver, page) = login_form();
        page.login(&driver, "user@example.com", "!@#$%^&*()_+{}|:\"<>?`~")
            .await
            .unwrap();
        assert_eq!(page.email_value(&driver).await.unwrap(), "user@example.com");
        assert_eq!(
            page.password_value(&driver).await.unwrap(),
            "!@#$%^&*()_+{}|:\"<>?`~"
        );
        assert_eq!(driver.calls(MockOp::Click), 1);
    }

    #[tokio::test]
    async fn test_whitespace_is_kept() {
        let (driver, page) = login_form();
        page.fill_email(&driver, " user@example.com ").await.unwrap();
        assert_eq!(page.email_value(&driver).await.unwrap(), " user@example.com ");
    }

    #[tokio::test]
    async fn test_clear_fields() {
        let (driver, page) = login_form();
        page.login(&driver, "a@b.c", "secret").await.unwrap();
        page.clear_email(&driver).await.unwrap();
        page.clear_password(&driver).await.unwrap();
        assert_eq!(page.email_value(&driver).await.unwrap(), "");
        assert_eq!(page.password_value(&driver).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_alternative_login_out_of_range_uses_first() {
        let (driver, page) = login_form();
        page.click_alternative_login(&driver, 3).await.unwrap();
        page.click_alternative_login(&driver, 9).await.unwrap();
        page.click_alternative_login(&driver, 0).await.unwrap();
        let history = driver.history();
        assert!(history[0].contains("nth-child(3)"));
        assert!(history[1].contains("nth-child(1)"));
        assert!(history[2].contains("nth-child(1)"));
    }

    #[tokio::test]
    async fn test_form_visibility() {
        let (driver, page) = login_form();
        assert!(page.is_login_form_visible(&driver).await.unwrap());
        driver.remove_element(&page.email_input);
        assert!(!page.is_login_form_visible(&driver).await.unwrap());
    }

    #[tokio::test]
    async fn test_navigate() {
        let driver = MockDriver::new().with_base_url("https://sweetshop.netlify.app");
        let page = LoginPage::new();
        page.navigate(&driver).await.unwrap();
        assert!(page.url_pattern().matches(&driver.url()));
    }

    #[test]
    fn test_submit_action_has_no_navigation_target() {
        let action = LoginPage::new().submit_action();
        assert!(action.navigation_target().is_none());
        assert!(!action.is_navigation());
    }
}
