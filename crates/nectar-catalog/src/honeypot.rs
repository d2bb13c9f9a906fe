//! Honeypot star schema.
//!
//! Three staging tables (honeypot events, IP geolocation, IP reputation)
//! feed four per-channel event dimensions, a location dimension and a
//! reputation dimension. The `attacks` fact joins events to locations on the
//! raw attacker IP and left-joins reputation on the normalized IP.
//!
//! `ip_locations` and `ip_reputation` hold one row per join key, so neither
//! join can fan out a fact row.

use crate::catalog::Catalog;
use crate::spec::{LoadTemplate, TableSpec, transform};

pub const STAGING_HONEYPOT: &str = "staging_honeypot";
pub const STAGING_IPGEO: &str = "staging_ipgeo";
pub const STAGING_REPUTATION: &str = "staging_reputation";

pub const GLASTOPF_EVENTS: &str = "glastopf_events";
pub const AMUN_EVENTS: &str = "amun_events";
pub const DIONAEA_CONNECTIONS: &str = "dionaea_connections";
pub const SNORT_ALERTS: &str = "snort_alerts";
pub const IP_LOCATIONS: &str = "ip_locations";
pub const IP_REPUTATION: &str = "ip_reputation";

pub const ATTACKS: &str = "attacks";

/// Fact column that is non-null only when the reputation join matched.
pub const REPUTATION_COLUMN: &str = "attacker_risk";

/// Channel names as they appear in `staging_honeypot.channel`, paired with
/// the dimension table each one populates.
pub const CHANNELS: [(&str, &str); 4] = [
    ("glastopf.events", GLASTOPF_EVENTS),
    ("amun.events", AMUN_EVENTS),
    ("dionaea.connections", DIONAEA_CONNECTIONS),
    ("snort.alerts", SNORT_ALERTS),
];

const STAGING_HONEYPOT_CREATE: &str = "
CREATE TABLE IF NOT EXISTS staging_honeypot
(
    id                  VARCHAR(255),
    ident               VARCHAR(255),
    normalized          BOOLEAN,
    timestamp           TIMESTAMP,
    channel             VARCHAR(255),
    pattern             VARCHAR(255),
    filename            VARCHAR(255),
    request_raw         VARCHAR(65535),
    request_url         VARCHAR(65535),
    attackerIP          VARCHAR(255),
    attackerPort        NUMERIC,
    victimPort          NUMERIC,
    victimIP            VARCHAR(255),
    connectionType      VARCHAR(255),
    connectionProtocol  VARCHAR(255),
    priority            INTEGER,
    header              VARCHAR(255),
    signature           VARCHAR(255),
    sensor              VARCHAR(255),
    connectionTransport VARCHAR(10),
    remoteHostname      VARCHAR(255)
);";

const STAGING_IPGEO_CREATE: &str = "
CREATE TABLE IF NOT EXISTS staging_ipgeo
(
    IP_orig       VARCHAR(255),
    IP            VARCHAR(255),
    country_code  VARCHAR(2),
    country_name  VARCHAR(255),
    region_code   VARCHAR(3),
    region_name   VARCHAR(255),
    city          VARCHAR(255),
    zip_code      VARCHAR(10),
    time_zone     VARCHAR(255),
    latitude      NUMERIC,
    longitude     NUMERIC,
    metro_code    INT
);";

const STAGING_REPUTATION_CREATE: &str = "
CREATE TABLE IF NOT EXISTS staging_reputation
(
    IP           VARCHAR(255),
    Reliability  INTEGER,
    Risk         INTEGER,
    Type         VARCHAR(255),
    Country      VARCHAR(2),
    Locale       VARCHAR(255),
    Latitude     NUMERIC,
    Longitude    NUMERIC
);";

const COPY_CSV: &str = "
COPY {table}
FROM '{source}'
IGNOREHEADER 1
credentials 'aws_iam_role={role}'
region '{region}' compupdate off
CSV;";

const COPY_CSV_TIMESTAMPED: &str = "
COPY {table}
FROM '{source}'
IGNOREHEADER 1
credentials 'aws_iam_role={role}'
region '{region}' compupdate off
TIMEFORMAT 'auto'
CSV;";

const GLASTOPF_EVENTS_CREATE: &str = "
CREATE TABLE IF NOT EXISTS glastopf_events
(
    id             VARCHAR(255),
    timestamp      TIMESTAMP,
    ident          VARCHAR(255),
    attacker_IP    VARCHAR(255),
    attacker_port  NUMERIC,
    victim_port    NUMERIC,
    pattern        VARCHAR(255),
    filename       VARCHAR(255),
    request_raw    VARCHAR(65535),
    request_url    VARCHAR(65535)
);";

const GLASTOPF_EVENTS_INSERT: &str = "
INSERT INTO glastopf_events
    (id, timestamp, ident, attacker_IP, attacker_port, victim_port,
     pattern, filename, request_raw, request_url)
SELECT DISTINCT id, timestamp, ident, attackerIP, attackerPort, victimPort,
       pattern, filename, request_raw, request_url
FROM staging_honeypot
WHERE channel = 'glastopf.events';";

const AMUN_EVENTS_CREATE: &str = "
CREATE TABLE IF NOT EXISTS amun_events
(
    id               VARCHAR(255),
    timestamp        TIMESTAMP,
    ident            VARCHAR(255),
    attacker_IP      VARCHAR(255),
    attacker_port    NUMERIC,
    victim_IP        VARCHAR(255),
    victim_port      NUMERIC,
    connection_type  VARCHAR(255)
);";

const AMUN_EVENTS_INSERT: &str = "
INSERT INTO amun_events
    (id, timestamp, ident, attacker_IP, attacker_port, victim_IP, victim_port,
     connection_type)
SELECT DISTINCT id, timestamp, ident, attackerIP, attackerPort, victimIP, victimPort,
       connectionType
FROM staging_honeypot
WHERE channel = 'amun.events';";

const DIONAEA_CONNECTIONS_CREATE: &str = "
CREATE TABLE IF NOT EXISTS dionaea_connections
(
    id                    VARCHAR(255),
    timestamp             TIMESTAMP,
    ident                 VARCHAR(255),
    attacker_IP           VARCHAR(255),
    attacker_port         NUMERIC,
    victim_IP             VARCHAR(255),
    victim_port           NUMERIC,
    connection_type       VARCHAR(255),
    connection_transport  VARCHAR(10),
    connection_protocol   VARCHAR(255),
    remote_hostname       VARCHAR(255)
);";

const DIONAEA_CONNECTIONS_INSERT: &str = "
INSERT INTO dionaea_connections
    (id, timestamp, ident, attacker_IP, attacker_port, victim_IP, victim_port,
     connection_type, connection_transport, connection_protocol, remote_hostname)
SELECT DISTINCT id, timestamp, ident, attackerIP, attackerPort, victimIP, victimPort,
       connectionType, connectionTransport, connectionProtocol, remoteHostname
FROM staging_honeypot
WHERE channel = 'dionaea.connections';";

const SNORT_ALERTS_CREATE: &str = "
CREATE TABLE IF NOT EXISTS snort_alerts
(
    id              VARCHAR(255),
    timestamp       TIMESTAMP,
    ident           VARCHAR(255),
    attacker_IP     VARCHAR(255),
    victim_IP       VARCHAR(255),
    classification  VARCHAR(255),
    protocol        VARCHAR(255),
    priority        INTEGER,
    header          VARCHAR(255),
    signature       VARCHAR(255),
    sensor          VARCHAR(255)
);";

const SNORT_ALERTS_INSERT: &str = "
INSERT INTO snort_alerts
    (id, timestamp, ident, attacker_IP, victim_IP, classification, protocol,
     priority, header, signature, sensor)
SELECT DISTINCT id, timestamp, ident, attackerIP, victimIP, connectionType, connectionProtocol,
       priority, header, signature, sensor
FROM staging_honeypot
WHERE channel = 'snort.alerts';";

const IP_LOCATIONS_CREATE: &str = "
CREATE TABLE IF NOT EXISTS ip_locations
(
    ip_orig       VARCHAR(255),
    ip            VARCHAR(255),
    country_code  VARCHAR(2),
    country_name  VARCHAR(255),
    region_name   VARCHAR(255),
    city          VARCHAR(255),
    time_zone     VARCHAR(255),
    latitude      NUMERIC,
    longitude     NUMERIC
);";

const IP_LOCATIONS_INSERT: &str = "
INSERT INTO ip_locations
    (ip_orig, ip, country_code, country_name, region_name, city, time_zone,
     latitude, longitude)
SELECT IP_orig, MAX(IP), MAX(country_code), MAX(country_name), MAX(region_name),
       MAX(city), MAX(time_zone), MAX(latitude), MAX(longitude)
FROM staging_ipgeo
WHERE IP_orig IS NOT NULL
GROUP BY IP_orig;";

const IP_REPUTATION_CREATE: &str = "
CREATE TABLE IF NOT EXISTS ip_reputation
(
    ip           VARCHAR(255),
    reliability  INTEGER,
    risk         INTEGER,
    type         VARCHAR(255),
    country      VARCHAR(2),
    locale       VARCHAR(255),
    latitude     NUMERIC,
    longitude    NUMERIC
);";

const IP_REPUTATION_INSERT: &str = "
INSERT INTO ip_reputation
    (ip, reliability, risk, type, country, locale, latitude, longitude)
SELECT IP, MAX(Reliability), MAX(Risk), MAX(Type), MAX(Country), MAX(Locale),
       MAX(Latitude), MAX(Longitude)
FROM staging_reputation
WHERE IP IS NOT NULL
GROUP BY IP;";

const ATTACKS_CREATE: &str = "
CREATE TABLE IF NOT EXISTS attacks
(
    id                    VARCHAR(255),
    timestamp             TIMESTAMP,
    ident                 VARCHAR(255),
    channel               VARCHAR(255),
    attacker_IP           VARCHAR(255),
    attacker_port         NUMERIC,
    victim_IP             VARCHAR(255),
    victim_port           NUMERIC,
    attacker_city         VARCHAR(255),
    attacker_region       VARCHAR(255),
    attacker_country      VARCHAR(255),
    attacker_timezone     VARCHAR(255),
    attacker_latitude     NUMERIC,
    attacker_longitude    NUMERIC,
    attacker_type         VARCHAR(255),
    attacker_risk         INTEGER,
    attacker_reliability  INTEGER
);";

const ATTACKS_INSERT: &str = "
INSERT INTO attacks
    (id, timestamp, ident, channel, attacker_IP, attacker_port, victim_IP, victim_port,
     attacker_city, attacker_region, attacker_country, attacker_timezone,
     attacker_latitude, attacker_longitude, attacker_type, attacker_risk,
     attacker_reliability)
SELECT DISTINCT h.id, h.timestamp, h.ident, h.channel, h.attackerIP, h.attackerPort,
       h.victimIP, h.victimPort,
       l.city, l.region_name, l.country_name, l.time_zone,
       l.latitude, l.longitude, r.type, r.risk, r.reliability
FROM staging_honeypot h
JOIN ip_locations l ON h.attackerIP = l.ip_orig
LEFT JOIN ip_reputation r ON l.ip = r.ip;";

/// The full honeypot catalog, in dependency order.
pub fn honeypot_catalog() -> Catalog {
    let channel_reads: &[&str] = &[STAGING_HONEYPOT];
    Catalog::new(vec![
        TableSpec::staging(
            STAGING_HONEYPOT,
            STAGING_HONEYPOT_CREATE,
            Some(LoadTemplate::new(COPY_CSV_TIMESTAMPED)),
        ),
        TableSpec::staging(
            STAGING_IPGEO,
            STAGING_IPGEO_CREATE,
            Some(LoadTemplate::new(COPY_CSV)),
        ),
        TableSpec::staging(
            STAGING_REPUTATION,
            STAGING_REPUTATION_CREATE,
            Some(LoadTemplate::new(COPY_CSV)),
        ),
        TableSpec::dimension(
            GLASTOPF_EVENTS,
            GLASTOPF_EVENTS_CREATE,
            Some(transform(GLASTOPF_EVENTS_INSERT, channel_reads)),
        ),
        TableSpec::dimension(
            AMUN_EVENTS,
            AMUN_EVENTS_CREATE,
            Some(transform(AMUN_EVENTS_INSERT, channel_reads)),
        ),
        TableSpec::dimension(
            DIONAEA_CONNECTIONS,
            DIONAEA_CONNECTIONS_CREATE,
            Some(transform(DIONAEA_CONNECTIONS_INSERT, channel_reads)),
        ),
        TableSpec::dimension(
            SNORT_ALERTS,
            SNORT_ALERTS_CREATE,
            Some(transform(SNORT_ALERTS_INSERT, channel_reads)),
        ),
        TableSpec::dimension(
            IP_LOCATIONS,
            IP_LOCATIONS_CREATE,
            Some(transform(IP_LOCATIONS_INSERT, &[STAGING_IPGEO])),
        ),
        TableSpec::dimension(
            IP_REPUTATION,
            IP_REPUTATION_CREATE,
            Some(transform(IP_REPUTATION_INSERT, &[STAGING_REPUTATION])),
        ),
        TableSpec::fact(
            ATTACKS,
            ATTACKS_CREATE,
            Some(transform(
                ATTACKS_INSERT,
                &[STAGING_HONEYPOT, IP_LOCATIONS, IP_REPUTATION],
            )),
        ),
    ])
}
