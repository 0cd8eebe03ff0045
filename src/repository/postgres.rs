use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::lifecycle::Scope;
use crate::models::{
    Comment, CommentView, NewComment, NewTicket, NewUser, PersonRef, ProfileChanges, Role, Ticket,
    TicketChanges, TicketFilter, TicketView, User, UserSummary,
};
use crate::repository::{
    CommentRepository, HealthCheckRepository, TicketRepository, UserRepository,
};
use crate::utils::error::{AppError, AppResult};

const TICKET_VIEW_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.status, t.priority, t.category,
           t.creator_id, t.assignee_id, t.created_at, t.updated_at,
           c.name AS creator_name, c.email AS creator_email,
           a.name AS assignee_name, a.email AS assignee_email
    FROM tickets t
    JOIN users c ON c.id = t.creator_id
    LEFT JOIN users a ON a.id = t.assignee_id
"#;

#[derive(FromRow)]
struct TicketViewRow {
    #[sqlx(flatten)]
    ticket: Ticket,
    creator_name: String,
    creator_email: String,
    assignee_name: Option<String>,
    assignee_email: Option<String>,
}

impl From<TicketViewRow> for TicketView {
    fn from(row: TicketViewRow) -> Self {
        let assignee = match (row.assignee_name, row.assignee_email) {
            (Some(name), Some(email)) => Some(PersonRef { name, email }),
            _ => None,
        };
        TicketView {
            ticket: row.ticket,
            creator: PersonRef {
                name: row.creator_name,
                email: row.creator_email,
            },
            assignee,
        }
    }
}

#[derive(FromRow)]
struct CommentRow {
    #[sqlx(flatten)]
    comment: Comment,
    author_name: String,
}

impl From<CommentRow> for CommentView {
    fn from(row: CommentRow) -> Self {
        CommentView::new(row.comment, row.author_name)
    }
}

fn map_unique_email(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("Email is already registered".to_string())
        }
        _ => AppError::DatabaseError(err),
    }
}

#[derive(Clone)]
pub struct PgHealthCheck {
    pool: PgPool,
}

impl PgHealthCheck {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthCheckRepository for PgHealthCheck {
    async fn check_db(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_email)
    }

    async fn upsert(&self, new_user: NewUser) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
                SET name = EXCLUDED.name,
                    password_hash = EXCLUDED.password_hash,
                    role = EXCLUDED.role,
                    updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list(&self, role: Option<Role>) -> AppResult<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, name, email, role
            FROM users
            WHERE $1::user_role IS NULL OR role = $1
            ORDER BY name ASC
            "#,
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                avatar_url = COALESCE($3, avatar_url),
                timezone = COALESCE($4, timezone),
                notify_on_assigned = COALESCE($5, notify_on_assigned),
                notify_on_comment = COALESCE($6, notify_on_comment),
                notify_on_resolved = COALESCE($7, notify_on_resolved),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.avatar_url)
        .bind(changes.timezone)
        .bind(changes.notify_on_assigned)
        .bind(changes.notify_on_comment)
        .bind(changes.notify_on_resolved)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn set_avatar(&self, id: Uuid, avatar_url: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET avatar_url = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(avatar_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn bump_token_version(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET token_version = token_version + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: Scope) {
        match scope {
            Scope::Creator(id) => {
                qb.push(" AND t.creator_id = ").push_bind(id);
            }
            Scope::AgentQueue(id) => {
                qb.push(" AND (t.assignee_id IS NULL OR t.assignee_id = ")
                    .push_bind(id)
                    .push(")");
            }
            Scope::All => {}
        }
    }

    fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TicketFilter) {
        if let Some(status) = filter.status {
            qb.push(" AND t.status = ").push_bind(status);
        }
        if let Some(priority) = filter.priority {
            qb.push(" AND t.priority = ").push_bind(priority);
        }
        if let Some(category) = filter.category {
            qb.push(" AND t.category = ").push_bind(category);
        }
        if let Some(assignee_id) = filter.assignee_id {
            qb.push(" AND t.assignee_id = ").push_bind(assignee_id);
        }
        if filter.unassigned {
            qb.push(" AND t.assignee_id IS NULL");
        }
    }
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    async fn create(&self, new_ticket: NewTicket) -> AppResult<Ticket> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (id, title, description, priority, category, creator_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_ticket.title)
        .bind(&new_ticket.description)
        .bind(new_ticket.priority)
        .bind(new_ticket.category)
        .bind(new_ticket.creator_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn find_view(&self, id: Uuid) -> AppResult<Option<TicketView>> {
        let mut qb = QueryBuilder::<Postgres>::new(TICKET_VIEW_SELECT);
        qb.push(" WHERE t.id = ").push_bind(id);

        let row = qb
            .build_query_as::<TicketViewRow>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(TicketView::from))
    }

    async fn list_open(&self, scope: Scope, filter: &TicketFilter) -> AppResult<Vec<TicketView>> {
        let mut qb = QueryBuilder::<Postgres>::new(TICKET_VIEW_SELECT);
        qb.push(" WHERE t.status <> 'CLOSED'");
        Self::push_scope(&mut qb, scope);
        Self::push_filter(&mut qb, filter);
        qb.push(" ORDER BY t.created_at DESC");

        let rows = qb
            .build_query_as::<TicketViewRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(TicketView::from).collect())
    }

    async fn list_closed_by_creator(&self, creator_id: Uuid) -> AppResult<Vec<TicketView>> {
        let mut qb = QueryBuilder::<Postgres>::new(TICKET_VIEW_SELECT);
        qb.push(" WHERE t.status = 'CLOSED' AND t.creator_id = ")
            .push_bind(creator_id)
            .push(" ORDER BY t.created_at DESC");

        let rows = qb
            .build_query_as::<TicketViewRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(TicketView::from).collect())
    }

    async fn claim(&self, id: Uuid, agent_id: Uuid) -> AppResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET assignee_id = $2, updated_at = NOW()
            WHERE id = $1
              AND status <> 'CLOSED'
              AND (assignee_id IS NULL OR assignee_id = $2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn update(&self, id: Uuid, changes: &TicketChanges) -> AppResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET status = COALESCE($2, status),
                priority = COALESCE($3, priority),
                updated_at = NOW()
            WHERE id = $1 AND status <> 'CLOSED'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.status)
        .bind(changes.priority)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn close(&self, id: Uuid) -> AppResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET status = 'CLOSED', updated_at = NOW()
            WHERE id = $1 AND status = 'RESOLVED'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }
}

#[derive(Clone)]
pub struct PgCommentRepository {
    pool: PgPool,
}

impl PgCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn create(&self, new_comment: NewComment) -> AppResult<CommentView> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (id, ticket_id, author_id, content, image_url)
                SELECT $1::uuid, t.id, $3::uuid, $4::text, $5::text
                FROM tickets t
                WHERE t.id = $2 AND t.status <> 'CLOSED'
                RETURNING *
            )
            SELECT inserted.*, u.name AS author_name
            FROM inserted
            JOIN users u ON u.id = inserted.author_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_comment.ticket_id)
        .bind(new_comment.author_id)
        .bind(&new_comment.content)
        .bind(&new_comment.image_url)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CommentView::from)
            .ok_or_else(|| AppError::Conflict("Ticket is closed".to_string()))
    }

    async fn list_for_ticket(&self, ticket_id: Uuid) -> AppResult<Vec<CommentView>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT cm.*, u.name AS author_name
            FROM comments cm
            JOIN users u ON u.id = cm.author_id
            WHERE cm.ticket_id = $1
            ORDER BY cm.created_at ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CommentView::from).collect())
    }
}
