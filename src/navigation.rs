//! Routing targets handed back by mutations. Callers decide how to render them.

use std::fmt;

use crate::api_types::Slug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardTab {
    Dash,
    Profile,
    Posts,
    Users,
    Comments,
    Files,
}

impl DashboardTab {
    pub fn as_str(self) -> &'static str {
        match self {
            DashboardTab::Dash => "dash",
            DashboardTab::Profile => "profile",
            DashboardTab::Posts => "posts",
            DashboardTab::Users => "users",
            DashboardTab::Comments => "comments",
            DashboardTab::Files => "files",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Home,
    SignIn,
    ArticleDetail { slug: Slug },
    Dashboard(DashboardTab),
}

impl Navigation {
    pub fn article(slug: Slug) -> Self {
        Navigation::ArticleDetail { slug }
    }

    /// Portal-relative path for this target.
    pub fn path(&self) -> String {
        match self {
            Navigation::Home => "/".to_string(),
            Navigation::SignIn => "/sign-in".to_string(),
            Navigation::ArticleDetail { slug } => format!("/post/{slug}"),
            Navigation::Dashboard(tab) => format!("/dashboard?tab={}", tab.as_str()),
        }
    }
}

impl fmt::Display for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
