use circled::db::Database;
use circled::groups::roles::Role;

#[tokio::test]
async fn test_file_database_persists_across_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("circled.db");
    let path = path.to_string_lossy().into_owned();

    let (user_id, group_id) = {
        let db = Database::new(&path).await?;
        let user = db
            .users()
            .register("alice", "alice@example.com", "pw-test-123")
            .await?;
        let group = db
            .groups()
            .create("g", None, Some(user.id), "INVFILE11")
            .await?;
        db.members().add(user.id, group.id, Role::Admin).await?;
        db.pool().close().await;
        (user.id, group.id)
    };

    let db = Database::new(&path).await?;
    let user = db.users().find_by_id(user_id).await?.unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(
        db.members().role_of(user_id, group_id).await?,
        Some(Role::Admin)
    );

    Ok(())
}
