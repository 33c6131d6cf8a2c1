mod common;

use circled::error::CoreError;
use circled::groups::roles::Role;
use circled::groups::{self, authz, invite};
use common::TestApp;

#[tokio::test]
async fn test_group_lifecycle() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let founder = app.user("miriam").await?;
    let (group, code) = app.group(founder, "Tuesday Study Group").await?;

    // The founder is enrolled as the sole admin.
    assert_eq!(
        app.db.members().role_of(founder, group).await?,
        Some(Role::Admin)
    );
    assert_eq!(code.len(), 9);
    assert!(code.starts_with("INV"));

    // A second user joins through the invite code as a plain member.
    let newcomer = app.user("ruth").await?;
    let joined = groups::join_via_code(&app.db, newcomer, &code).await?;
    assert_eq!(joined.group_id, group);
    assert_eq!(joined.role, Role::Member);

    // Joining twice reports the existing membership.
    let err = groups::join_via_code(&app.db, newcomer, &code)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AlreadyMember));

    // Promote the newcomer, then the founder can step away.
    groups::promote_user(&app.db, founder, newcomer, group, "admin").await?;
    assert_eq!(
        app.db.members().role_of(newcomer, group).await?,
        Some(Role::Admin)
    );
    groups::leave_group(&app.db, founder, group).await?;

    // The remaining user is now both the only admin and the only
    // member; the only-admin check fires first.
    let err = groups::leave_group(&app.db, newcomer, group).await.unwrap_err();
    assert!(matches!(err, CoreError::OnlyAdmin));

    Ok(())
}

#[tokio::test]
async fn test_last_member_cannot_leave() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let user = app.user("solo").await?;
    // Seed a group with a single non-admin member directly.
    let group = app
        .db
        .groups()
        .create("g", None, None, "INVSOLO11")
        .await?
        .id;
    app.db.members().add(user, group, Role::Member).await?;

    let err = authz::can_leave(&app.db, user, group).await.unwrap_err();
    assert!(matches!(err, CoreError::LastMember));

    Ok(())
}

#[tokio::test]
async fn test_promote_check_ordering() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let admin = app.user("admin").await?;
    let member = app.user("member").await?;
    let outsider = app.user("outsider").await?;
    let (group, code) = app.group(admin, "g").await?;
    groups::join_via_code(&app.db, member, &code).await?;

    // A non-admin actor is rejected before anything else is looked at,
    // even with a garbage role.
    let err = groups::promote_user(&app.db, member, admin, group, "nonsense")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotAdmin));

    // Target must be a member before the role is validated.
    let err = groups::promote_user(&app.db, admin, outsider, group, "nonsense")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotMember));

    // Then the role name itself.
    let err = groups::promote_user(&app.db, admin, member, group, "owner")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidRole(ref r) if r == "owner"));

    // And finally the no-op assignment.
    let err = groups::promote_user(&app.db, admin, member, group, "member")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AlreadyHasRole(Role::Member)));

    Ok(())
}

#[tokio::test]
async fn test_join_with_unknown_code() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let user = app.user("alice").await?;

    let err = groups::join_via_code(&app.db, user, "INVZZZ999")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::GroupNotFound));

    Ok(())
}

#[tokio::test]
async fn test_invite_rotation() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let admin = app.user("admin").await?;
    let member = app.user("member").await?;
    let (group, old_code) = app.group(admin, "g").await?;
    groups::join_via_code(&app.db, member, &old_code).await?;

    // Only admins rotate.
    let err = groups::rotate_invite_code(&app.db, member, group, "BSG")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotAdmin));

    // Lowercase input is normalized; the fresh code carries the prefix.
    let new_code = groups::rotate_invite_code(&app.db, admin, group, " bsg ").await?;
    assert_eq!(new_code.len(), 9);
    assert!(new_code.starts_with("BSG"));

    // The old code no longer resolves.
    let err = groups::join_via_code(&app.db, app.user("late").await?, &old_code)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::GroupNotFound));
    assert!(invite::parse_code(&new_code).is_some());

    // A bad prefix reports every violated rule at once.
    let err = groups::rotate_invite_code(&app.db, admin, group, "toolong!")
        .await
        .unwrap_err();
    match err {
        CoreError::InviteCodeInvalid(reasons) => assert_eq!(reasons.len(), 2),
        other => panic!("expected InviteCodeInvalid, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn test_update_rules_bounds() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let admin = app.user("admin").await?;
    let member = app.user("member").await?;
    let (group, code) = app.group(admin, "g").await?;
    groups::join_via_code(&app.db, member, &code).await?;

    let err = groups::update_rules(&app.db, member, group, "be nice", groups::RULES_MAX_LEN)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotAdmin));

    groups::update_rules(&app.db, admin, group, "be nice", groups::RULES_MAX_LEN).await?;
    let record = app.db.groups().find_by_id(group).await?.unwrap();
    assert_eq!(record.rules_info, "be nice");

    let oversized = "x".repeat(groups::RULES_MAX_LEN + 1);
    let err = groups::update_rules(&app.db, admin, group, &oversized, groups::RULES_MAX_LEN)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::RulesTooLong { .. }));

    Ok(())
}

#[tokio::test]
async fn test_member_listing_and_group_views() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let admin = app.user("admin").await?;
    let member = app.user("member").await?;
    let outsider = app.user("outsider").await?;
    let (group, code) = app.group(admin, "g").await?;
    groups::join_via_code(&app.db, member, &code).await?;

    let members = groups::active_members(&app.db, member, group).await?;
    assert_eq!(members.len(), 2);

    let err = groups::active_members(&app.db, outsider, group)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotMember));

    let err = groups::group_for_member(&app.db, outsider, group)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotMember));

    let mine = groups::groups_for_user(&app.db, member).await?;
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, group);

    Ok(())
}

#[tokio::test]
async fn test_delete_group_is_admin_only() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let admin = app.user("admin").await?;
    let member = app.user("member").await?;
    let (group, code) = app.group(admin, "g").await?;
    groups::join_via_code(&app.db, member, &code).await?;

    let err = groups::delete_group(&app.db, member, group).await.unwrap_err();
    assert!(matches!(err, CoreError::NotAdmin));

    groups::delete_group(&app.db, admin, group).await?;
    assert!(app.db.groups().find_by_id(group).await?.is_none());
    // Membership rows cascade with the group.
    assert!(app.db.members().members_of(group).await?.is_empty());

    Ok(())
}
