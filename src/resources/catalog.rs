//! Which resources exist, their tables, their schema level, and their route group.
//!
//! Level rank follows foreign keys: a table only references tables at a lower rank.

use crate::error::ConfigError;
use crate::resources::handlers::{resource_router, ResourceState};
use crate::resources::{ResourceModule, CREATE_TABLE};
use crate::routes::{bootstrap_status, RouteEntry, RouteGroup, RouteRegistry};
use crate::schema::{Level, SchemaRegistry, TableDef, Unit};
use crate::state::AppState;
use axum::routing::get;
use sqlx::PgPool;

const USERS: TableDef = TableDef {
    name: "users",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "email TEXT NOT NULL UNIQUE",
        "full_name TEXT NOT NULL",
        "phone TEXT",
        "role TEXT NOT NULL DEFAULT 'buyer'",
        "password_hash TEXT",
        "is_active BOOLEAN NOT NULL DEFAULT TRUE",
    ],
    constraints: &["CONSTRAINT users_role_check CHECK (role IN ('buyer', 'agent', 'admin'))"],
    indexes: &["CREATE INDEX IF NOT EXISTS users_role_idx ON {schema}.users (role)"],
    alters: &["ALTER TABLE {schema}.users ADD COLUMN IF NOT EXISTS avatar_url TEXT"],
};

const AGENCIES: TableDef = TableDef {
    name: "agencies",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "name TEXT NOT NULL",
        "slug TEXT NOT NULL UNIQUE",
        "license_number TEXT",
        "website TEXT",
        "verified BOOLEAN NOT NULL DEFAULT FALSE",
    ],
    constraints: &[],
    indexes: &[],
    alters: &[],
};

const DEVELOPERS: TableDef = TableDef {
    name: "developers",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "name TEXT NOT NULL",
        "slug TEXT NOT NULL UNIQUE",
        "established_year INTEGER",
        "description TEXT",
    ],
    constraints: &[],
    indexes: &[],
    alters: &[],
};

const CITIES: TableDef = TableDef {
    name: "cities",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "name TEXT NOT NULL",
        "state TEXT NOT NULL",
        "country TEXT NOT NULL DEFAULT 'IN'",
    ],
    constraints: &["UNIQUE (name, state, country)"],
    indexes: &[],
    alters: &[],
};

const PROPERTY_TYPES: TableDef = TableDef {
    name: "property_types",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "name TEXT NOT NULL UNIQUE",
        "category TEXT NOT NULL",
    ],
    constraints: &["CONSTRAINT property_types_category_check CHECK (category IN ('residential', 'commercial', 'land'))"],
    indexes: &[],
    alters: &[],
};

const AMENITIES: TableDef = TableDef {
    name: "amenities",
    columns: &["id BIGSERIAL PRIMARY KEY", "name TEXT NOT NULL UNIQUE", "icon TEXT"],
    constraints: &[],
    indexes: &[],
    alters: &[],
};

const BLOG_CATEGORIES: TableDef = TableDef {
    name: "blog_categories",
    columns: &["id BIGSERIAL PRIMARY KEY", "name TEXT NOT NULL", "slug TEXT NOT NULL UNIQUE"],
    constraints: &[],
    indexes: &[],
    alters: &[],
};

const LOCALITIES: TableDef = TableDef {
    name: "localities",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "city_id BIGINT NOT NULL REFERENCES {schema}.cities(id) ON DELETE CASCADE",
        "name TEXT NOT NULL",
        "pincode TEXT",
        "latitude DOUBLE PRECISION",
        "longitude DOUBLE PRECISION",
    ],
    constraints: &["UNIQUE (city_id, name)"],
    indexes: &["CREATE INDEX IF NOT EXISTS localities_city_idx ON {schema}.localities (city_id)"],
    alters: &[],
};

const AGENTS: TableDef = TableDef {
    name: "agents",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "user_id BIGINT NOT NULL UNIQUE REFERENCES {schema}.users(id) ON DELETE CASCADE",
        "agency_id BIGINT REFERENCES {schema}.agencies(id) ON DELETE SET NULL",
        "rera_id TEXT",
        "experience_years INTEGER NOT NULL DEFAULT 0",
    ],
    constraints: &[],
    indexes: &["CREATE INDEX IF NOT EXISTS agents_agency_idx ON {schema}.agents (agency_id)"],
    alters: &[],
};

const PROJECTS: TableDef = TableDef {
    name: "projects",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "developer_id BIGINT NOT NULL REFERENCES {schema}.developers(id)",
        "city_id BIGINT NOT NULL REFERENCES {schema}.cities(id)",
        "name TEXT NOT NULL",
        "slug TEXT NOT NULL UNIQUE",
        "status TEXT NOT NULL DEFAULT 'upcoming'",
        "possession_date DATE",
    ],
    constraints: &["CONSTRAINT projects_status_check CHECK (status IN ('upcoming', 'under_construction', 'ready'))"],
    indexes: &["CREATE INDEX IF NOT EXISTS projects_city_idx ON {schema}.projects (city_id)"],
    alters: &["ALTER TABLE {schema}.projects ADD COLUMN IF NOT EXISTS brochure_url TEXT"],
};

const BLOGS: TableDef = TableDef {
    name: "blogs",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "author_id BIGINT NOT NULL REFERENCES {schema}.users(id)",
        "category_id BIGINT REFERENCES {schema}.blog_categories(id) ON DELETE SET NULL",
        "title TEXT NOT NULL",
        "slug TEXT NOT NULL UNIQUE",
        "body TEXT NOT NULL",
        "published_at TIMESTAMPTZ",
    ],
    constraints: &[],
    indexes: &["CREATE INDEX IF NOT EXISTS blogs_published_idx ON {schema}.blogs (published_at DESC)"],
    alters: &[],
};

const CHAT_FLOWS: TableDef = TableDef {
    name: "chat_flows",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "agency_id BIGINT REFERENCES {schema}.agencies(id) ON DELETE CASCADE",
        "name TEXT NOT NULL",
        "is_active BOOLEAN NOT NULL DEFAULT TRUE",
    ],
    constraints: &[],
    indexes: &[],
    alters: &[],
};

const LISTINGS: TableDef = TableDef {
    name: "listings",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "agent_id BIGINT REFERENCES {schema}.agents(id) ON DELETE SET NULL",
        "owner_id BIGINT REFERENCES {schema}.users(id) ON DELETE SET NULL",
        "locality_id BIGINT NOT NULL REFERENCES {schema}.localities(id)",
        "property_type_id BIGINT NOT NULL REFERENCES {schema}.property_types(id)",
        "project_id BIGINT REFERENCES {schema}.projects(id) ON DELETE SET NULL",
        "title TEXT NOT NULL",
        "purpose TEXT NOT NULL DEFAULT 'sale'",
        "price NUMERIC(14, 2) NOT NULL",
        "area_sqft NUMERIC(10, 2)",
        "bedrooms SMALLINT",
        "bathrooms SMALLINT",
        "status TEXT NOT NULL DEFAULT 'draft'",
        "description TEXT",
    ],
    constraints: &[
        "CONSTRAINT listings_purpose_check CHECK (purpose IN ('sale', 'rent'))",
        "CONSTRAINT listings_status_check CHECK (status IN ('draft', 'active', 'sold', 'archived'))",
    ],
    indexes: &[
        "CREATE INDEX IF NOT EXISTS listings_locality_idx ON {schema}.listings (locality_id)",
        "CREATE INDEX IF NOT EXISTS listings_status_price_idx ON {schema}.listings (status, price)",
    ],
    alters: &["ALTER TABLE {schema}.listings ADD COLUMN IF NOT EXISTS furnishing TEXT"],
};

const PROJECT_UNITS: TableDef = TableDef {
    name: "project_units",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "project_id BIGINT NOT NULL REFERENCES {schema}.projects(id) ON DELETE CASCADE",
        "property_type_id BIGINT NOT NULL REFERENCES {schema}.property_types(id)",
        "label TEXT NOT NULL",
        "area_sqft NUMERIC(10, 2)",
        "base_price NUMERIC(14, 2)",
    ],
    constraints: &["UNIQUE (project_id, label)"],
    indexes: &[],
    alters: &[],
};

const CHAT_FLOW_STEPS: TableDef = TableDef {
    name: "chat_flow_steps",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "flow_id BIGINT NOT NULL REFERENCES {schema}.chat_flows(id) ON DELETE CASCADE",
        "position INTEGER NOT NULL",
        "prompt TEXT NOT NULL",
        "options JSONB NOT NULL DEFAULT '[]'::jsonb",
    ],
    constraints: &["UNIQUE (flow_id, position)"],
    indexes: &[],
    alters: &[],
};

const BLOG_COMMENTS: TableDef = TableDef {
    name: "blog_comments",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "blog_id BIGINT NOT NULL REFERENCES {schema}.blogs(id) ON DELETE CASCADE",
        "user_id BIGINT REFERENCES {schema}.users(id) ON DELETE SET NULL",
        "body TEXT NOT NULL",
    ],
    constraints: &[],
    indexes: &["CREATE INDEX IF NOT EXISTS blog_comments_blog_idx ON {schema}.blog_comments (blog_id)"],
    alters: &[],
};

const LISTING_IMAGES: TableDef = TableDef {
    name: "listing_images",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "listing_id BIGINT NOT NULL REFERENCES {schema}.listings(id) ON DELETE CASCADE",
        "url TEXT NOT NULL",
        "position INTEGER NOT NULL DEFAULT 0",
        "is_cover BOOLEAN NOT NULL DEFAULT FALSE",
    ],
    constraints: &[],
    indexes: &["CREATE INDEX IF NOT EXISTS listing_images_listing_idx ON {schema}.listing_images (listing_id)"],
    alters: &[],
};

const LISTING_AMENITIES: TableDef = TableDef {
    name: "listing_amenities",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "listing_id BIGINT NOT NULL REFERENCES {schema}.listings(id) ON DELETE CASCADE",
        "amenity_id BIGINT NOT NULL REFERENCES {schema}.amenities(id) ON DELETE CASCADE",
    ],
    constraints: &["UNIQUE (listing_id, amenity_id)"],
    indexes: &[],
    alters: &[],
};

const FAVORITES: TableDef = TableDef {
    name: "favorites",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "user_id BIGINT NOT NULL REFERENCES {schema}.users(id) ON DELETE CASCADE",
        "listing_id BIGINT NOT NULL REFERENCES {schema}.listings(id) ON DELETE CASCADE",
    ],
    constraints: &["UNIQUE (user_id, listing_id)"],
    indexes: &[],
    alters: &[],
};

const ENQUIRIES: TableDef = TableDef {
    name: "enquiries",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "listing_id BIGINT NOT NULL REFERENCES {schema}.listings(id) ON DELETE CASCADE",
        "user_id BIGINT REFERENCES {schema}.users(id) ON DELETE SET NULL",
        "agent_id BIGINT REFERENCES {schema}.agents(id) ON DELETE SET NULL",
        "name TEXT NOT NULL",
        "phone TEXT NOT NULL",
        "message TEXT",
        "status TEXT NOT NULL DEFAULT 'new'",
    ],
    constraints: &["CONSTRAINT enquiries_status_check CHECK (status IN ('new', 'contacted', 'closed'))"],
    indexes: &["CREATE INDEX IF NOT EXISTS enquiries_agent_status_idx ON {schema}.enquiries (agent_id, status)"],
    alters: &[],
};

const REVIEWS: TableDef = TableDef {
    name: "reviews",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "user_id BIGINT NOT NULL REFERENCES {schema}.users(id) ON DELETE CASCADE",
        "agent_id BIGINT REFERENCES {schema}.agents(id) ON DELETE CASCADE",
        "listing_id BIGINT REFERENCES {schema}.listings(id) ON DELETE CASCADE",
        "rating SMALLINT NOT NULL",
        "comment TEXT",
    ],
    constraints: &[
        "CONSTRAINT reviews_rating_check CHECK (rating BETWEEN 1 AND 5)",
        "CONSTRAINT reviews_target_check CHECK (agent_id IS NOT NULL OR listing_id IS NOT NULL)",
    ],
    indexes: &[],
    alters: &[],
};

const CHAT_SESSIONS: TableDef = TableDef {
    name: "chat_sessions",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "flow_id BIGINT NOT NULL REFERENCES {schema}.chat_flows(id) ON DELETE CASCADE",
        "user_id BIGINT REFERENCES {schema}.users(id) ON DELETE SET NULL",
        "listing_id BIGINT REFERENCES {schema}.listings(id) ON DELETE SET NULL",
        "answers JSONB NOT NULL DEFAULT '{}'::jsonb",
        "completed_at TIMESTAMPTZ",
    ],
    constraints: &[],
    indexes: &[],
    alters: &[],
};

const ANALYTICS_EVENTS: TableDef = TableDef {
    name: "analytics_events",
    columns: &[
        "id BIGSERIAL PRIMARY KEY",
        "event_type TEXT NOT NULL",
        "user_id BIGINT REFERENCES {schema}.users(id) ON DELETE SET NULL",
        "listing_id BIGINT REFERENCES {schema}.listings(id) ON DELETE SET NULL",
        "payload JSONB NOT NULL DEFAULT '{}'::jsonb",
        "occurred_at TIMESTAMPTZ NOT NULL DEFAULT NOW()",
    ],
    constraints: &[],
    indexes: &[
        "CREATE INDEX IF NOT EXISTS analytics_events_type_time_idx ON {schema}.analytics_events (event_type, occurred_at)",
        "CREATE INDEX IF NOT EXISTS analytics_events_listing_idx ON {schema}.analytics_events (listing_id)",
    ],
    alters: &[],
};

const ANALYTICS_SUMMARY_VIEW: &str = "CREATE OR REPLACE VIEW {schema}.analytics_summary AS \
     SELECT l.id AS listing_id, \
            COUNT(e.id) FILTER (WHERE e.event_type = 'view') AS views, \
            COUNT(e.id) FILTER (WHERE e.event_type = 'contact') AS contacts, \
            MAX(e.occurred_at) AS last_event_at \
     FROM {schema}.listings l \
     LEFT JOIN {schema}.analytics_events e ON e.listing_id = l.id \
     GROUP BY l.id";

const fn table_module(
    name: &'static str,
    description: &'static str,
    table: TableDef,
    path: &'static str,
) -> ResourceModule {
    ResourceModule {
        name,
        description,
        table: Some(table),
        init: &[],
        path: Some(path),
    }
}

pub const MODULES: &[ResourceModule] = &[
    table_module("users", "registered buyers, owners, agents and admins", USERS, "/users"),
    table_module("agencies", "brokerage firms", AGENCIES, "/agencies"),
    table_module("developers", "builders behind projects", DEVELOPERS, "/developers"),
    table_module("cities", "served cities", CITIES, "/cities"),
    table_module("property_types", "apartment, villa, plot, office", PROPERTY_TYPES, "/property-types"),
    table_module("amenities", "amenity dictionary", AMENITIES, "/amenities"),
    table_module("blog_categories", "blog taxonomy", BLOG_CATEGORIES, "/blog-categories"),
    table_module("localities", "neighbourhoods within a city", LOCALITIES, "/localities"),
    table_module("agents", "agent profiles linked to users", AGENTS, "/agents"),
    table_module("projects", "new-build projects", PROJECTS, "/projects"),
    table_module("blogs", "editorial posts", BLOGS, "/blogs"),
    table_module("chat_flows", "scripted lead-capture flows", CHAT_FLOWS, "/chat-flows"),
    table_module("listings", "properties for sale or rent", LISTINGS, "/listings"),
    table_module("project_units", "unit configurations within a project", PROJECT_UNITS, "/project-units"),
    table_module("chat_flow_steps", "ordered prompts of a chat flow", CHAT_FLOW_STEPS, "/chat-flow-steps"),
    table_module("blog_comments", "reader comments", BLOG_COMMENTS, "/blog-comments"),
    table_module("listing_images", "listing photos", LISTING_IMAGES, "/listing-images"),
    table_module("listing_amenities", "amenities offered by a listing", LISTING_AMENITIES, "/listing-amenities"),
    table_module("favorites", "saved listings", FAVORITES, "/favorites"),
    table_module("enquiries", "buyer enquiries on listings", ENQUIRIES, "/enquiries"),
    table_module("reviews", "ratings of agents and listings", REVIEWS, "/reviews"),
    table_module("chat_sessions", "answers captured by chat flows", CHAT_SESSIONS, "/chat-sessions"),
    table_module("analytics_events", "raw engagement events", ANALYTICS_EVENTS, "/analytics/events"),
    ResourceModule {
        name: "analytics_summary",
        description: "per-listing engagement rollup view",
        table: None,
        init: &[ANALYTICS_SUMMARY_VIEW],
        path: Some("/analytics/summary"),
    },
];

pub fn module(name: &str) -> Option<&'static ResourceModule> {
    MODULES.iter().find(|m| m.name == name)
}

struct LevelSpec {
    rank: u32,
    name: &'static str,
    description: &'static str,
    /// (module name, critical)
    units: &'static [(&'static str, bool)],
}

const LEVELS: &[LevelSpec] = &[
    LevelSpec {
        rank: 1,
        name: "core",
        description: "tables without foreign keys",
        units: &[
            ("users", true),
            ("agencies", true),
            ("developers", false),
            ("cities", false),
            ("property_types", false),
            ("amenities", false),
            ("blog_categories", false),
        ],
    },
    LevelSpec {
        rank: 2,
        name: "reference",
        description: "tables referencing core tables only",
        units: &[
            ("localities", false),
            ("agents", false),
            ("projects", false),
            ("blogs", false),
            ("chat_flows", false),
        ],
    },
    LevelSpec {
        rank: 3,
        name: "inventory",
        description: "listings and other second-order tables",
        units: &[
            ("listings", false),
            ("project_units", false),
            ("chat_flow_steps", false),
            ("blog_comments", false),
        ],
    },
    LevelSpec {
        rank: 4,
        name: "engagement",
        description: "tables hanging off listings",
        units: &[
            ("listing_images", false),
            ("listing_amenities", false),
            ("favorites", false),
            ("enquiries", false),
            ("reviews", false),
            ("chat_sessions", false),
            ("analytics_events", false),
        ],
    },
    LevelSpec {
        rank: 5,
        name: "reporting",
        description: "views over engagement data",
        units: &[("analytics_summary", false)],
    },
];

/// Route groups by business area, in mount order.
const AREAS: &[(&str, &[&str])] = &[
    ("accounts", &["users", "agencies", "agents", "developers"]),
    (
        "inventory",
        &[
            "cities",
            "localities",
            "property_types",
            "amenities",
            "projects",
            "project_units",
            "listings",
            "listing_images",
            "listing_amenities",
        ],
    ),
    ("content", &["blog_categories", "blogs", "blog_comments"]),
    ("engagement", &["favorites", "enquiries", "reviews"]),
    ("chat", &["chat_flows", "chat_flow_steps", "chat_sessions"]),
    ("analytics", &["analytics_events", "analytics_summary"]),
];

/// Schema registry for every resource module, bound to `pool` and `schema`.
pub fn schema_registry(pool: &PgPool, schema: &str) -> Result<SchemaRegistry, ConfigError> {
    let levels = LEVELS
        .iter()
        .map(|spec| {
            let level = Level::new(spec.rank, spec.name).describe(spec.description);
            spec.units.iter().fold(level, |level, &(name, critical)| {
                let unit = match module(name) {
                    Some(m) => Unit::resolved(name, &m.bind(pool, schema), CREATE_TABLE)
                        .describe(m.description),
                    None => Unit::unresolved(name),
                };
                level.unit(if critical { unit.critical() } else { unit })
            })
        })
        .collect();
    SchemaRegistry::new(levels)
}

/// Route registry for every resource module plus the system group.
pub fn route_registry(state: &AppState, schema: &str) -> RouteRegistry {
    let registry = AREAS.iter().fold(RouteRegistry::new(), |registry, &(area, names)| {
        let group = names.iter().fold(RouteGroup::new(area), |group, &name| match module(name) {
            Some(m) => match m.path {
                Some(path) => group.entry(
                    path,
                    resource_router(ResourceState::new(state.pool.clone(), schema, m)),
                ),
                None => group,
            },
            None => group.push(RouteEntry::optional(format!("/{}", name.replace('_', "-")), None)),
        });
        registry.group(group)
    });
    registry.group(
        RouteGroup::new("system").entry("/system/bootstrap", get(bootstrap_status).with_state(state.clone())),
    )
}
