use sqlx::sqlite::SqlitePool;

/// Create the demo schema and fill it once
pub async fn setup(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            is_active BOOLEAN DEFAULT true
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name VARCHAR(120) NOT NULL,
            price REAL NOT NULL,
            stock INTEGER DEFAULT 0,
            category TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id INTEGER REFERENCES customers(id),
            item_id INTEGER REFERENCES items(id),
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            total REAL NOT NULL,
            status TEXT DEFAULT 'pending',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // No primary key constraint: rows are addressed through the `id` column
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER NOT NULL,
            action TEXT NOT NULL,
            detail TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Internal bookkeeping, hidden by the default `z_` prefix
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS z_seed_state (
            id INTEGER PRIMARY KEY,
            seeded_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    seed_sample_data(pool).await
}

async fn seed_sample_data(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let seeded: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM z_seed_state")
        .fetch_one(pool)
        .await?;
    if seeded.0 > 0 {
        tracing::debug!("sample data already present");
        return Ok(());
    }

    let mut transaction = pool.begin().await?;

    let first_names = [
        "Alice", "Bob", "Charlie", "Diana", "Evan", "Fiona", "George", "Hannah",
        "Isaac", "Julia", "Kevin", "Laura", "Michael", "Nancy", "Oscar", "Patricia",
    ];
    let last_names = [
        "Johnson", "Smith", "Brown", "Prince", "Davis", "Wilson", "Taylor", "Anderson",
        "Thomas", "Jackson", "White", "Harris", "Martin", "Thompson", "Garcia",
    ];

    for index in 0..120 {
        let first = first_names[index % first_names.len()];
        let last = last_names[index % last_names.len()];
        let email = format!("{}.{}{}@example.com", first.to_lowercase(), last.to_lowercase(), index);
        sqlx::query("INSERT INTO customers (name, email, is_active) VALUES (?, ?, ?)")
            .bind(format!("{} {}", first, last))
            .bind(email)
            .bind(index % 5 != 0)
            .execute(&mut *transaction)
            .await?;
    }

    let categories = ["Electronics", "Furniture", "Stationery", "Kitchen", "Garden", "Toys"];
    let prefixes = ["Premium", "Basic", "Pro", "Compact", "Deluxe"];
    let kinds = [
        "Widget", "Gadget", "Lamp", "Chair", "Notebook", "Kettle", "Shovel", "Puzzle",
        "Router", "Cable", "Shelf", "Planter",
    ];

    for index in 0..150 {
        let name = format!(
            "{} {} {}",
            prefixes[index % prefixes.len()],
            kinds[index % kinds.len()],
            index + 1
        );
        let price = 4.99 + (index as f64 * 2.5) + ((index % 7) as f64 * 1.25);
        sqlx::query("INSERT INTO items (name, price, stock, category) VALUES (?, ?, ?, ?)")
            .bind(name)
            .bind(price)
            .bind(((index * 7 + 5) % 300) as i64)
            .bind(categories[index % categories.len()])
            .execute(&mut *transaction)
            .await?;
    }

    let statuses = ["pending", "processing", "shipped", "completed", "cancelled"];
    for index in 0..1000_i64 {
        let item_id = (index % 150) + 1;
        let quantity = (index % 5) + 1;
        let total = quantity as f64 * (4.99 + (item_id - 1) as f64 * 2.5);
        sqlx::query(
            "INSERT INTO orders (customer_id, item_id, quantity, total, status) VALUES (?, ?, ?, ?, ?)",
        )
        .bind((index % 120) + 1)
        .bind(item_id)
        .bind(quantity)
        .bind(total)
        .bind(statuses[(index % 5) as usize])
        .execute(&mut *transaction)
        .await?;
    }

    for index in 1..=40_i64 {
        let action = if index % 4 == 0 { "delete" } else { "update" };
        sqlx::query("INSERT INTO audit_log (id, action, detail) VALUES (?, ?, ?)")
            .bind(index)
            .bind(action)
            .bind(format!("{} on order {}", action, index * 3))
            .execute(&mut *transaction)
            .await?;
    }

    sqlx::query("INSERT INTO z_seed_state (id) VALUES (1)")
        .execute(&mut *transaction)
        .await?;

    transaction.commit().await?;

    tracing::info!(
        customers = 120,
        items = 150,
        orders = 1000,
        audit_log = 40,
        "sample data seeded"
    );
    Ok(())
}
