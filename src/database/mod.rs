use crate::models::{Appointment, Case, Constitution, Document, Notification, User};
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;

pub const USERS: &str = "users";
pub const CASES: &str = "cases";
pub const APPOINTMENTS: &str = "appointments";
pub const DOCUMENTS: &str = "documents";
pub const CONSTITUTIONS: &str = "constitutions";
pub const NOTIFICATIONS: &str = "notifications";

const DEFAULT_DATABASE: &str = "legalease";

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.app_name = Some("legalease-service".to_string());
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));
        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        // Database name comes from the URI path, e.g. mongodb://host/legalease
        let db_name = client_options
            .default_database
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(&db_name);

        db.run_command(doc! { "ping": 1 }).await?;
        log::info!("✅ Connected to MongoDB database: {}", db_name);

        let mongodb = Self { client, db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        // A duplicate email index is a hard failure; registration relies on it.
        self.users().create_index(unique_email).await?;
        log::info!("   ✅ Index created: users(email) unique");

        let indexes: Vec<(&str, mongodb::bson::Document)> = vec![
            (USERS, doc! { "role": 1, "isActive": 1 }),
            (CASES, doc! { "clientId": 1 }),
            (CASES, doc! { "lawyerId": 1 }),
            (APPOINTMENTS, doc! { "lawyerId": 1, "date": 1 }),
            (APPOINTMENTS, doc! { "clientId": 1, "date": 1 }),
            (APPOINTMENTS, doc! { "date": 1, "status": 1 }),
            (DOCUMENTS, doc! { "caseId": 1 }),
            (CONSTITUTIONS, doc! { "category": 1 }),
            (CONSTITUTIONS, doc! { "uploadedBy": 1 }),
            (CONSTITUTIONS, doc! { "isPublic": 1 }),
            (NOTIFICATIONS, doc! { "recipient": 1, "read": 1 }),
            (NOTIFICATIONS, doc! { "createdAt": 1 }),
        ];

        for (collection, keys) in indexes {
            let description = format!("{}({})", collection, keys.keys().cloned().collect::<Vec<_>>().join(", "));
            let model = IndexModel::builder().keys(keys).build();
            match self.db.collection::<mongodb::bson::Document>(collection).create_index(model).await {
                Ok(_) => log::info!("   ✅ Index created: {}", description),
                Err(e) => log::debug!("   ℹ️  Index already exists: {} ({})", description, e),
            }
        }

        log::info!("✅ Database indexes ready");
        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn users(&self) -> Collection<User> {
        self.collection(USERS)
    }

    pub fn cases(&self) -> Collection<Case> {
        self.collection(CASES)
    }

    pub fn appointments(&self) -> Collection<Appointment> {
        self.collection(APPOINTMENTS)
    }

    pub fn documents(&self) -> Collection<Document> {
        self.collection(DOCUMENTS)
    }

    pub fn constitutions(&self) -> Collection<Constitution> {
        self.collection(CONSTITUTIONS)
    }

    pub fn notifications(&self) -> Collection<Notification> {
        self.collection(NOTIFICATIONS)
    }

    pub async fn ping(&self) -> mongodb::error::Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    /// Closes pooled connections. Call once the HTTP server has stopped.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        log::info!("🔌 MongoDB connection closed");
    }
}

#[cfg(test)]
pub(crate) async fn test_database() -> MongoDB {
    dotenv::dotenv().ok();
    let uri = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "mongodb://localhost:27017/legalease_test".to_string());
    MongoDB::new(&uri).await.expect("MongoDB must be running for ignored tests")
}
