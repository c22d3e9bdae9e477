use geofence_bus::{Signal, Subscription};
use geofence_region::{Coordinate, PresenceState, Region, RegionError, RegionStateRepository};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const KEY_LATITUDE: &str = "latitude";
const KEY_LONGITUDE: &str = "longitude";
const KEY_RADIUS: &str = "radius";
const KEY_ACTIVE: &str = "active";
const KEY_PRESENCE: &str = "presence";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] RegionError),
    #[error("corrupt value for '{key}': {value:?}")]
    Corrupt { key: &'static str, value: String },
    #[error("store lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Durable store for the configured region and last known presence.
///
/// Each field lives under its own key. Multi-key writes run in one SQLite
/// transaction, and presence subscribers are notified while the connection
/// lock is still held, so notification order always matches commit order.
pub struct RegionStateStore {
    conn: Mutex<Connection>,
    presence: Signal<PresenceState>,
}

impl RegionStateStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened region state store");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        let presence = read_presence(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            presence: Signal::new(presence),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Persist an active region and reset presence to unknown.
    ///
    /// Validation happens before any write, so a rejected region leaves the
    /// previous one untouched.
    pub fn set_region(&self, center: Coordinate, radius_meters: f32) -> Result<Region> {
        let region = Region::new(center, radius_meters)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        put(&tx, KEY_LATITUDE, &region.center.latitude.to_string())?;
        put(&tx, KEY_LONGITUDE, &region.center.longitude.to_string())?;
        put(&tx, KEY_RADIUS, &region.radius_meters.to_string())?;
        put(&tx, KEY_ACTIVE, "true")?;
        put(&tx, KEY_PRESENCE, PresenceState::Unknown.as_str())?;
        tx.commit()?;

        self.presence.publish(PresenceState::Unknown);
        tracing::info!(region = %region, "region saved");
        Ok(region)
    }

    /// Deactivate the region and reset presence to unknown. Idempotent.
    pub fn clear_region(&self) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM region_state WHERE key IN (?1, ?2, ?3)",
            (KEY_LATITUDE, KEY_LONGITUDE, KEY_RADIUS),
        )?;
        put(&tx, KEY_ACTIVE, "false")?;
        put(&tx, KEY_PRESENCE, PresenceState::Unknown.as_str())?;
        tx.commit()?;

        self.presence.publish(PresenceState::Unknown);
        tracing::info!("region cleared");
        Ok(())
    }

    /// The configured region, or `None` when inactive.
    pub fn region(&self) -> Result<Option<Region>> {
        let conn = self.conn()?;
        if get(&conn, KEY_ACTIVE)?.as_deref() != Some("true") {
            return Ok(None);
        }

        let latitude: f64 = parse(KEY_LATITUDE, get(&conn, KEY_LATITUDE)?)?;
        let longitude: f64 = parse(KEY_LONGITUDE, get(&conn, KEY_LONGITUDE)?)?;
        let radius_meters: f32 = parse(KEY_RADIUS, get(&conn, KEY_RADIUS)?)?;

        Ok(Some(Region {
            center: Coordinate::new(latitude, longitude),
            radius_meters,
            active: true,
        }))
    }

    /// Persist presence and notify subscribers.
    ///
    /// Returns `false` without writing or notifying when `state` is already
    /// the stored value.
    pub fn set_presence(&self, state: PresenceState) -> Result<bool> {
        let conn = self.conn()?;
        let current = read_presence(&conn)?;
        if current == state {
            tracing::trace!(presence = %state, "presence unchanged");
            return Ok(false);
        }

        put(&conn, KEY_PRESENCE, state.as_str())?;
        self.presence.publish(state);
        tracing::debug!(from = %current, to = %state, "presence updated");
        Ok(true)
    }

    pub fn presence(&self) -> Result<PresenceState> {
        read_presence(&*self.conn()?)
    }

    /// Current presence first, then one value per committed change.
    pub fn subscribe_presence(&self) -> Subscription<PresenceState> {
        self.presence.subscribe()
    }
}

impl RegionStateRepository for RegionStateStore {
    type Error = StorageError;

    fn set_region(&self, center: Coordinate, radius_meters: f32) -> Result<Region> {
        RegionStateStore::set_region(self, center, radius_meters)
    }

    fn clear_region(&self) -> Result<()> {
        RegionStateStore::clear_region(self)
    }

    fn region(&self) -> Result<Option<Region>> {
        RegionStateStore::region(self)
    }

    fn set_presence(&self, state: PresenceState) -> Result<bool> {
        RegionStateStore::set_presence(self, state)
    }

    fn presence(&self) -> Result<PresenceState> {
        RegionStateStore::presence(self)
    }

    fn subscribe_presence(&self) -> Subscription<PresenceState> {
        RegionStateStore::subscribe_presence(self)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS region_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn put(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO region_state (key, value) VALUES (?1, ?2)",
        (key, value),
    )?;
    Ok(())
}

fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT value FROM region_state WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?)
}

fn parse<T: std::str::FromStr>(key: &'static str, value: Option<String>) -> Result<T> {
    let value = value.ok_or(StorageError::Corrupt {
        key,
        value: String::new(),
    })?;
    value
        .parse()
        .map_err(|_| StorageError::Corrupt { key, value })
}

fn read_presence(conn: &Connection) -> Result<PresenceState> {
    match get(conn, KEY_PRESENCE)? {
        None => Ok(PresenceState::Unknown),
        Some(value) => value
            .parse()
            .map_err(|_| StorageError::Corrupt {
                key: KEY_PRESENCE,
                value,
            }),
    }
}
