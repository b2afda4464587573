use chrono::Duration;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::db::{Settings, User};
use crate::model::store::{Coll, Store, StoreError};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    default_admin_email: String,
    // secrets
    jwt_secret: String,
    default_admin_password: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign auth JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Email of the super admin seeded on first launch.
    pub fn default_admin_email(&self) -> &str {
        &self.default_admin_email
    }

    /// Password of the super admin seeded on first launch.
    pub fn default_admin_password(&self) -> &str {
        &self.default_admin_password
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the store fairing and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the record store.
#[derive(Deserialize)]
struct StoreConfig {
    store_path: String,
}

/// A fairing that opens the record store, seeds first-launch defaults, and
/// places the [`Store`] into managed state.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Record store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config. The admin credentials are extracted separately so
        // this fairing does not depend on `ConfigFairing` having run first.
        let store_config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        info!("Opening record store at {}", store_config.store_path);
        let store = Store::open(&store_config.store_path);
        if let Err(e) = seed_defaults(&store, &config) {
            error!("Failed to seed the record store: {e}");
            return Err(rocket);
        }

        // Manage the state.
        rocket = rocket.manage(store);
        Ok(rocket)
    }
}

/// Ensure the settings record exists and that there is at least one admin
/// account to log in with. Idempotent across launches.
fn seed_defaults(store: &Store, config: &Config) -> Result<(), StoreError> {
    if !store.has_settings() {
        info!("Seeding default settings");
        store.put_settings(&Settings::default())?;
    }

    let users = Coll::<User>::from_store(store);
    let has_admin = users.all().iter().any(|u| u.role.rights().is_admin());
    if !has_admin {
        info!(
            "No admin account found, seeding {}",
            config.default_admin_email()
        );
        let admin = User::super_admin(
            config.default_admin_email(),
            config.default_admin_password(),
        );
        users.insert(admin)?;
    }

    Ok(())
}
