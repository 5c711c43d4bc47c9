use chrono::NaiveDate;
use eventhub::{
    config::AppConfig,
    db::{create_pool, orm_from_pool},
    services::{
        event_service::{EventDraft, EventService, NewEvent, PgEventService, TicketTypeDraft},
        user_service::hash_password,
    },
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@eventhub.co", "admin123", "Administrador", "administrador").await?;
    let organizer_id =
        ensure_user(&pool, "organizador@eventhub.co", "organizador123", "Laura Gómez", "organizador").await?;
    let attendee_id = ensure_user(&pool, "asistente@eventhub.co", "asistente123", "Carlos Ruiz", "asistente").await?;

    let events = PgEventService::new(orm_from_pool(&pool), pool.clone());
    seed_events(&pool, &events, organizer_id).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, Organizer ID: {organizer_id}, Attendee ID: {attendee_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    nombre: &str,
    rol: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO usuarios (id, email, password_hash, nombre, rol)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET rol = EXCLUDED.rol
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(nombre)
    .bind(rol)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (rol={rol})");
    Ok(row.0)
}

async fn seed_events(
    pool: &sqlx::PgPool,
    service: &PgEventService,
    organizer_id: Uuid,
) -> anyhow::Result<()> {
    let drafts = vec![
        draft(
            "Concierto Sinfónico de Año Nuevo",
            "Música",
            NaiveDate::from_ymd_opt(2026, 12, 30),
            "Teatro Colón, Bogotá",
            120_000,
            800,
            vec![("Platea", 180_000, 300), ("Balcón", 120_000, 500)],
        ),
        draft(
            "Bogotá Tech Summit",
            "Tecnología",
            NaiveDate::from_ymd_opt(2026, 11, 14),
            "Ágora Bogotá",
            250_000,
            1500,
            vec![("General", 250_000, 1200), ("Workshop", 450_000, 300)],
        ),
        draft(
            "Feria Gastronómica del Pacífico",
            "Gastronomía",
            NaiveDate::from_ymd_opt(2026, 10, 25),
            "Plaza de Mercado, Cali",
            35_000,
            2000,
            vec![],
        ),
    ];

    for draft in drafts.into_iter().flatten() {
        let exists: Option<(String,)> = sqlx::query_as("SELECT id::text FROM eventos WHERE titulo = $1")
            .bind(&draft.title)
            .fetch_optional(pool)
            .await?;
        if exists.is_some() {
            continue;
        }
        let title = draft.title.clone();
        service
            .create(NewEvent {
                organizer_id,
                organizer_name: "Laura Gómez".to_string(),
                draft,
            })
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        println!("Seeded event {title}");
    }

    Ok(())
}

fn draft(
    title: &str,
    category: &str,
    date: Option<NaiveDate>,
    location: &str,
    price: i64,
    max_attendees: i32,
    tiers: Vec<(&str, i64, i32)>,
) -> Option<EventDraft> {
    Some(EventDraft {
        title: title.to_string(),
        description: Some(format!("{title} en {location}")),
        image: None,
        date: date?,
        time: Some("19:00".to_string()),
        location: location.to_string(),
        category: category.to_string(),
        price,
        max_attendees,
        status: None,
        tags: vec![category.to_lowercase()],
        ticket_types: tiers
            .into_iter()
            .map(|(name, price, max_quantity)| TicketTypeDraft {
                id: None,
                name: name.to_string(),
                price,
                description: None,
                max_quantity,
            })
            .collect(),
    })
}
