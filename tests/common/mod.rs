#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use helpdesk_server::bootstrap::seed_user;
use helpdesk_server::config::{Config, SeedUser};
use helpdesk_server::lifecycle::Scope;
use helpdesk_server::models::{
    Comment, CommentView, NewComment, NewTicket, NewUser, PersonRef, ProfileChanges, Role, Ticket,
    TicketChanges, TicketFilter, TicketStatus, TicketView, User, UserSummary,
};
use helpdesk_server::repository::{
    CommentRepository, HealthCheckRepository, TicketRepository, UserRepository,
};
use helpdesk_server::routes::create_routes;
use helpdesk_server::state::{AppState, Repositories};
use helpdesk_server::utils::{AppError, AppResult};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tickets: Vec<Ticket>,
    comments: Vec<Comment>,
    // Strictly increasing timestamps keep "newest first" deterministic.
    clock: i64,
}

impl Tables {
    fn tick(&mut self) -> chrono::DateTime<Utc> {
        self.clock += 1;
        Utc.timestamp_opt(1_700_000_000 + self.clock, 0).unwrap()
    }

    fn person(&self, id: Uuid) -> Option<PersonRef> {
        self.users.iter().find(|u| u.id == id).map(|u| PersonRef {
            name: u.name.clone(),
            email: u.email.clone(),
        })
    }

    fn view(&self, ticket: &Ticket) -> TicketView {
        TicketView {
            ticket: ticket.clone(),
            creator: self.person(ticket.creator_id).unwrap_or(PersonRef {
                name: String::new(),
                email: String::new(),
            }),
            assignee: ticket.assignee_id.and_then(|id| self.person(id)),
        }
    }

    fn comment_view(&self, comment: &Comment) -> CommentView {
        let author = self
            .users
            .iter()
            .find(|u| u.id == comment.author_id)
            .map(|u| u.name.clone())
            .unwrap_or_default();
        CommentView::new(comment.clone(), author)
    }

    fn ticket_mut(&mut self, id: Uuid) -> Option<&mut Ticket> {
        self.tickets.iter_mut().find(|t| t.id == id)
    }
}

/// In-memory stand-in for Postgres, implementing every repository trait.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    pub db_down: Mutex<bool>,
    /// When set, this agent takes the next claimed ticket just before the
    /// conditional write runs, as a concurrent request would.
    pub rival_claim: Mutex<Option<Uuid>>,
}

impl MemoryStore {
    pub fn ticket(&self, id: Uuid) -> Ticket {
        let tables = self.tables.lock().unwrap();
        tables.tickets.iter().find(|t| t.id == id).cloned().unwrap()
    }

    pub fn user_by_email(&self, email: &str) -> User {
        let tables = self.tables.lock().unwrap();
        tables.users.iter().find(|u| u.email == email).cloned().unwrap()
    }

    /// Forces a status, bypassing the HTTP rules, for test setup.
    pub fn force_status(&self, id: Uuid, status: TicketStatus) {
        let mut tables = self.tables.lock().unwrap();
        tables.ticket_mut(id).unwrap().status = status;
    }
}

#[async_trait]
impl HealthCheckRepository for MemoryStore {
    async fn check_db(&self) -> bool {
        !*self.db_down.lock().unwrap()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.lock().unwrap();
        if tables.users.iter().any(|u| u.email == new_user.email) {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }
        let now = tables.tick();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            token_version: 0,
            avatar_url: None,
            timezone: None,
            notify_on_assigned: true,
            notify_on_comment: true,
            notify_on_resolved: true,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn upsert(&self, new_user: NewUser) -> AppResult<User> {
        {
            let mut tables = self.tables.lock().unwrap();
            let now = tables.tick();
            if let Some(existing) = tables.users.iter_mut().find(|u| u.email == new_user.email) {
                existing.name = new_user.name;
                existing.password_hash = new_user.password_hash;
                existing.role = new_user.role;
                existing.updated_at = now;
                return Ok(existing.clone());
            }
        }
        UserRepository::create(self, new_user).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list(&self, role: Option<Role>) -> AppResult<Vec<UserSummary>> {
        let tables = self.tables.lock().unwrap();
        let mut users: Vec<UserSummary> = tables
            .users
            .iter()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .map(UserSummary::from)
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<User> {
        let mut tables = self.tables.lock().unwrap();
        let now = tables.tick();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(url) = changes.avatar_url {
            user.avatar_url = Some(url);
        }
        if let Some(tz) = changes.timezone {
            user.timezone = Some(tz);
        }
        if let Some(v) = changes.notify_on_assigned {
            user.notify_on_assigned = v;
        }
        if let Some(v) = changes.notify_on_comment {
            user.notify_on_comment = v;
        }
        if let Some(v) = changes.notify_on_resolved {
            user.notify_on_resolved = v;
        }
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn set_avatar(&self, id: Uuid, avatar_url: &str) -> AppResult<User> {
        let mut tables = self.tables.lock().unwrap();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.avatar_url = Some(avatar_url.to_string());
        Ok(user.clone())
    }

    async fn bump_token_version(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.iter_mut().find(|u| u.id == id) {
            user.token_version += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl TicketRepository for MemoryStore {
    async fn create(&self, new_ticket: NewTicket) -> AppResult<Ticket> {
        let mut tables = self.tables.lock().unwrap();
        let now = tables.tick();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            title: new_ticket.title,
            description: new_ticket.description,
            status: TicketStatus::Open,
            priority: new_ticket.priority,
            category: new_ticket.category,
            creator_id: new_ticket.creator_id,
            assignee_id: None,
            created_at: now,
            updated_at: now,
        };
        tables.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Ticket>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn find_view(&self, id: Uuid) -> AppResult<Option<TicketView>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .tickets
            .iter()
            .find(|t| t.id == id)
            .map(|t| tables.view(t)))
    }

    async fn list_open(&self, scope: Scope, filter: &TicketFilter) -> AppResult<Vec<TicketView>> {
        let tables = self.tables.lock().unwrap();
        let mut tickets: Vec<&Ticket> = tables
            .tickets
            .iter()
            .filter(|t| !t.is_closed() && scope.admits(t) && filter.matches(t))
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets.into_iter().map(|t| tables.view(t)).collect())
    }

    async fn list_closed_by_creator(&self, creator_id: Uuid) -> AppResult<Vec<TicketView>> {
        let tables = self.tables.lock().unwrap();
        let mut tickets: Vec<&Ticket> = tables
            .tickets
            .iter()
            .filter(|t| t.is_closed() && t.creator_id == creator_id)
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets.into_iter().map(|t| tables.view(t)).collect())
    }

    async fn claim(&self, id: Uuid, agent_id: Uuid) -> AppResult<Option<Ticket>> {
        let mut tables = self.tables.lock().unwrap();
        let now = tables.tick();
        let Some(ticket) = tables.ticket_mut(id) else {
            return Ok(None);
        };
        if let Some(rival) = self.rival_claim.lock().unwrap().take() {
            if ticket.assignee_id.is_none() {
                ticket.assignee_id = Some(rival);
            }
        }
        if ticket.is_closed() || ticket.assignee_id.is_some_and(|a| a != agent_id) {
            return Ok(None);
        }
        ticket.assignee_id = Some(agent_id);
        ticket.updated_at = now;
        Ok(Some(ticket.clone()))
    }

    async fn update(&self, id: Uuid, changes: &TicketChanges) -> AppResult<Option<Ticket>> {
        let mut tables = self.tables.lock().unwrap();
        let now = tables.tick();
        let Some(ticket) = tables.ticket_mut(id) else {
            return Ok(None);
        };
        if ticket.is_closed() {
            return Ok(None);
        }
        if let Some(status) = changes.status {
            ticket.status = status;
        }
        if let Some(priority) = changes.priority {
            ticket.priority = priority;
        }
        ticket.updated_at = now;
        Ok(Some(ticket.clone()))
    }

    async fn close(&self, id: Uuid) -> AppResult<Option<Ticket>> {
        let mut tables = self.tables.lock().unwrap();
        let now = tables.tick();
        let Some(ticket) = tables.ticket_mut(id) else {
            return Ok(None);
        };
        if ticket.status != TicketStatus::Resolved {
            return Ok(None);
        }
        ticket.status = TicketStatus::Closed;
        ticket.updated_at = now;
        Ok(Some(ticket.clone()))
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create(&self, new_comment: NewComment) -> AppResult<CommentView> {
        let mut tables = self.tables.lock().unwrap();
        let open = tables
            .tickets
            .iter()
            .any(|t| t.id == new_comment.ticket_id && !t.is_closed());
        if !open {
            return Err(AppError::Conflict("Ticket is closed".to_string()));
        }
        let now = tables.tick();
        let comment = Comment {
            id: Uuid::new_v4(),
            ticket_id: new_comment.ticket_id,
            author_id: new_comment.author_id,
            content: new_comment.content,
            image_url: new_comment.image_url,
            created_at: now,
        };
        tables.comments.push(comment.clone());
        Ok(tables.comment_view(&comment))
    }

    async fn list_for_ticket(&self, ticket_id: Uuid) -> AppResult<Vec<CommentView>> {
        let tables = self.tables.lock().unwrap();
        let mut comments: Vec<&Comment> = tables
            .comments
            .iter()
            .filter(|c| c.ticket_id == ticket_id)
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments.into_iter().map(|c| tables.comment_view(c)).collect())
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub session: Option<String>,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn error_code(&self) -> &str {
        self.body["error"]["code"].as_str().unwrap_or_default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub uploads: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let mut config = Config::local();
        config.auth_secret = "integration-secret".to_string();
        config.upload_dir = uploads.path().to_path_buf();
        config.max_upload_bytes = 64 * 1024;

        let store = Arc::new(MemoryStore::default());
        let repos = Repositories {
            health: store.clone(),
            users: store.clone(),
            tickets: store.clone(),
            comments: store.clone(),
        };
        let state = AppState::new(config, repos);

        Self {
            router: create_routes(state.clone()),
            store,
            state,
            uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let session = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("auth="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            body,
            session,
        }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        session: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = session {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    /// Registers a USER and returns its session cookie.
    pub async fn register(&self, name: &str, email: &str) -> String {
        let res = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(serde_json::json!({ "name": name, "email": email, "password": "pass1234" })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.session.expect("registration sets the session cookie")
    }

    /// Provisions a staff account through the startup seed path and logs in.
    pub async fn staff(&self, name: &str, email: &str, role: Role) -> String {
        seed_user(
            &self.state,
            &SeedUser {
                name: name.to_string(),
                email: email.to_string(),
                password: "staffpass".to_string(),
                role,
            },
        )
        .await
        .unwrap();
        self.login(email, "staffpass").await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let res = self
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        res.session.expect("login sets the session cookie")
    }

    /// Files a ticket and returns its id.
    pub async fn open_ticket(&self, session: &str, title: &str) -> Uuid {
        let res = self
            .call(
                Method::POST,
                "/api/tickets",
                Some(session),
                Some(serde_json::json!({
                    "title": title,
                    "description": "Something is broken",
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.data()["id"].as_str().unwrap().parse().unwrap()
    }
}

pub fn ids(list: &Value) -> Vec<Uuid> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap().parse().unwrap())
        .collect()
}
