use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Opaque backend identifier (a document id on the server side).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// URL-stable article identifier assigned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Slug {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

/// Article rubric. The set is closed; anything else the server sends decodes
/// to [`Category::Uncategorized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Jateng,
    Nasional,
    Teknologi,
    Lifestyle,
    Olahraga,
    Travel,
    Pendidikan,
    Sosial,
    Ekonomi,
    Politik,
    Cerpen,
    Puisi,
    #[serde(other)]
    Uncategorized,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Jateng,
        Category::Nasional,
        Category::Teknologi,
        Category::Lifestyle,
        Category::Olahraga,
        Category::Travel,
        Category::Pendidikan,
        Category::Sosial,
        Category::Ekonomi,
        Category::Politik,
        Category::Cerpen,
        Category::Puisi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Jateng => "jateng",
            Category::Nasional => "nasional",
            Category::Teknologi => "teknologi",
            Category::Lifestyle => "lifestyle",
            Category::Olahraga => "olahraga",
            Category::Travel => "travel",
            Category::Pendidikan => "pendidikan",
            Category::Sosial => "sosial",
            Category::Ekonomi => "ekonomi",
            Category::Politik => "politik",
            Category::Cerpen => "cerpen",
            Category::Puisi => "puisi",
            Category::Uncategorized => "uncategorized",
        }
    }

    /// Whether the category may be sent in a create or update request.
    pub fn is_assignable(self) -> bool {
        self != Category::Uncategorized
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == needle)
            .ok_or_else(|| format!("unknown category `{value}`"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub slug: Slug,
    pub title: String,
    pub category: Category,
    #[serde(rename = "content", default)]
    pub body_html: String,
    #[serde(rename = "image", default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_alt: Option<String>,
    #[serde(rename = "userId", default)]
    pub author_id: Option<ObjectId>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub updated_at: Option<OffsetDateTime>,
}

/// Neighbour reference returned next to an article (previous/next links).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub slug: Slug,
    pub title: String,
    #[serde(rename = "image", default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub post_id: ObjectId,
    pub user_id: ObjectId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(rename = "profilePicture", default)]
    pub profile_picture_url: Option<String>,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(rename = "profilePicture", default)]
    pub profile_picture_url: Option<String>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadableFile {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(alias = "filename")]
    pub title: String,
    #[serde(rename = "fileUrl", default)]
    pub stored_file_url: Option<String>,
    #[serde(rename = "imagePath", default)]
    pub thumbnail_image_url: Option<String>,
    #[serde(rename = "size", default)]
    pub size_bytes: u64,
    #[serde(rename = "mimetype", default)]
    pub mime_type: Option<String>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub created_at: Option<OffsetDateTime>,
}
