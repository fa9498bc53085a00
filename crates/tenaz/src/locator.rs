//! Locator abstraction for element selection.
//!
//! A [`Locator`] is a lazy reference to one or more elements of a page. It is
//! resolved by the [`PageDriver`](crate::PageDriver) each time an action runs,
//! never cached, so a locator stays valid across navigations.

use std::fmt;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// XPath selector
    XPath(String),
    /// Text content selector
    Text(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// CSS selector filtered by text content
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(path: impl Into<String>) -> Self {
        Self::XPath(path.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// JavaScript expression evaluating to the array of matching elements
    #[must_use]
    pub fn to_all_query(&self) -> String {
        match self {
            Self::Css(s) => format!("Array.from(document.querySelectorAll({s:?}))"),
            Self::XPath(s) => format!(
                "(() => {{ const r = document.evaluate({s:?}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 return Array.from({{ length: r.snapshotLength }}, (_, i) => r.snapshotItem(i)); }})()"
            ),
            Self::Text(t) => format!(
                "Array.from(document.querySelectorAll('body *')).filter(el => el.children.length === 0 && el.textContent.includes({t:?}))"
            ),
            Self::TestId(id) => {
                format!("Array.from(document.querySelectorAll('[data-testid={id:?}]'))")
            }
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({css:?})).filter(el => el.textContent.includes({text:?}))"
            ),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css={s}"),
            Self::XPath(s) => write!(f, "xpath={s}"),
            Self::Text(t) => write!(f, "text={t}"),
            Self::TestId(id) => write!(f, "data-testid={id}"),
            Self::CssWithText { css, text } => write!(f, "css={css} >> text={text}"),
        }
    }
}

/// A lazy reference to elements in a page context.
///
/// Without an index the locator targets the first match, like `.first()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    selector: Selector,
    nth: Option<usize>,
}

impl Locator {
    /// Create a locator from a CSS selector string
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css(selector.into()))
    }

    /// Create a locator from any selector
    #[must_use]
    pub const fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            nth: None,
        }
    }

    /// Narrow the locator to elements containing `text`
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        let selector = match self.selector {
            Selector::Css(css) => Selector::CssWithText {
                css,
                text: text.into(),
            },
            other => other,
        };
        Self {
            selector,
            nth: self.nth,
        }
    }

    /// Target the element at `index` among all matches
    #[must_use]
    pub const fn nth(mut self, index: usize) -> Self {
        self.nth = Some(index);
        self
    }

    /// Target the first match explicitly
    #[must_use]
    pub const fn first(self) -> Self {
        self.nth(0)
    }

    /// Underlying selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Index among matches, if narrowed
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.nth
    }

    /// JavaScript expression resolving to the single targeted element (or `undefined`)
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("{}[{}]", self.selector.to_all_query(), self.nth.unwrap_or(0))
    }

    /// JavaScript expression counting matches
    #[must_use]
    pub fn to_count_query(&self) -> String {
        format!("{}.length", self.selector.to_all_query())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.nth {
            Some(n) => write!(f, "{} >> nth={n}", self.selector),
            None => write!(f, "{}", self.selector),
        }
    }
}

impl From<Selector> for Locator {
    fn from(selector: Selector) -> Self {
        Self::from_selector(selector)
    }
}
