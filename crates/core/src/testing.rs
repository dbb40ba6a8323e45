//! In-memory implementation of every port, for service tests.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use splitledger_shared::config::LedgerConfig;
use splitledger_shared::types::{
    CategoryId, ExpenseId, GroupId, InvitationId, ParticipantRef, PaymentId,
    PendingParticipantId, RecurringExpenseId, SettlementId, SplitId, UserId,
};

use crate::activity::{ActivityEntry, ActivitySink};
use crate::balance::BalanceService;
use crate::directory::{CategoryInfo, Directory, FriendshipStatus, GroupInfo, MemberRole, Membership};
use crate::identity::{
    AccountGateway, Account, IdentityStore, InvitationService, Invitation, InvitationStatus, MergeReport,
    NewInvitation, PendingParticipant,
};
use crate::ledger::{
    Expense, ExpenseChanges, ExpenseQuery, ExpenseService, ExpenseStore, ExpenseWithLines, FriendPair, LedgerLine,
    LineSide, NewExpense, NewPayment, NewSplit, Payment, Split,
};
use crate::recurring::{
    NewRecurringTemplate, OccurrenceCommit, RecurringChanges, RecurringService, RecurringStore,
    RecurringTemplate,
};
use crate::settlement::{
    NewSettlement, Settlement, SettlementChanges, SettlementService, SettlementStatus,
    SettlementStore,
};
use crate::store::{StoreError, StoreResult};

#[derive(Default)]
struct State {
    groups: Vec<GroupInfo>,
    members: Vec<Membership>,
    friendships: Vec<(FriendPair, FriendshipStatus)>,
    categories: Vec<CategoryInfo>,
    expenses: Vec<ExpenseWithLines>,
    settlements: Vec<Settlement>,
    pending: Vec<PendingParticipant>,
    invitations: Vec<Invitation>,
    accounts: Vec<(Account, String)>,
    templates: Vec<RecurringTemplate>,
    activity: Vec<ActivityEntry>,
}

/// Every port backed by vectors behind one lock.
#[derive(Default)]
pub(crate) struct InMemory {
    state: Mutex<State>,
    fail_writes: AtomicBool,
    fail_activity: AtomicBool,
    keep_placeholders: AtomicBool,
}

impl InMemory {
    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Backend("injected write failure".into()))
        } else {
            Ok(())
        }
    }

    /// Makes every mutating store call fail.
    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes the activity sink fail.
    pub(crate) fn fail_activity(&self, fail: bool) {
        self.fail_activity.store(fail, Ordering::SeqCst);
    }

    /// Makes placeholder reclamation fail during merges.
    pub(crate) fn keep_placeholders(&self, keep: bool) {
        self.keep_placeholders.store(keep, Ordering::SeqCst);
    }

    pub(crate) fn add_group(&self, name: &str, currency: &str) -> GroupId {
        let id = GroupId::new();
        self.with(|s| {
            s.groups.push(GroupInfo {
                id,
                name: name.to_string(),
                currency: currency.to_string(),
            });
        });
        id
    }

    pub(crate) fn add_member(&self, group_id: GroupId, user_id: UserId) {
        self.with(|s| {
            s.members.push(Membership {
                group_id,
                user_id,
                role: MemberRole::Member,
            });
        });
    }

    pub(crate) fn remove_member(&self, group_id: GroupId, user_id: UserId) {
        self.with(|s| {
            s.members
                .retain(|m| !(m.group_id == group_id && m.user_id == user_id));
        });
    }

    pub(crate) fn add_friendship(&self, a: UserId, b: UserId, status: FriendshipStatus) {
        self.with(|s| s.friendships.push((FriendPair::new(a, b), status)));
    }

    pub(crate) fn add_category(&self, group_id: GroupId, name: &str) -> CategoryId {
        let id = CategoryId::new();
        self.with(|s| {
            s.categories.push(CategoryInfo {
                id,
                group_id,
                name: name.to_string(),
            });
        });
        id
    }

    pub(crate) fn add_account(&self, name: &str, email: &str, password: &str) -> Account {
        let account = Account {
            id: UserId::new(),
            email: email.to_string(),
            name: name.to_string(),
        };
        self.with(|s| s.accounts.push((account.clone(), password.to_string())));
        account
    }

    pub(crate) fn expense_count(&self) -> usize {
        self.with(|s| s.expenses.len())
    }

    pub(crate) fn activity(&self) -> Vec<ActivityEntry> {
        self.with(|s| s.activity.clone())
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.with(|s| s.pending.len())
    }

    pub(crate) fn template(&self, id: RecurringExpenseId) -> Option<RecurringTemplate> {
        self.with(|s| s.templates.iter().find(|t| t.id == id).cloned())
    }
}

/// A group with two members and every service wired to one `InMemory`.
pub(crate) struct Fixture {
    pub(crate) mem: Arc<InMemory>,
    pub(crate) expenses: Arc<ExpenseService>,
    pub(crate) settlements: SettlementService,
    pub(crate) balances: BalanceService,
    pub(crate) invitations: InvitationService,
    pub(crate) recurring: RecurringService,
    pub(crate) group: GroupId,
    pub(crate) alice: UserId,
    pub(crate) bob: UserId,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let mem = Arc::new(InMemory::default());
        let settings = LedgerConfig::default();

        let expenses = Arc::new(ExpenseService::new(
            mem.clone(),
            mem.clone(),
            mem.clone(),
            settings.clone(),
        ));
        let settlements =
            SettlementService::new(mem.clone(), mem.clone(), mem.clone(), settings.clone());
        let balances = BalanceService::new(mem.clone(), mem.clone());
        let invitations = InvitationService::new(mem.clone(), mem.clone(), mem.clone(), settings);
        let recurring = RecurringService::new(mem.clone(), expenses.clone(), mem.clone());

        let group = mem.add_group("Flat 4B", "EUR");
        let alice = mem.add_account("Alice", "alice@example.com", "alice-pw").id;
        let bob = mem.add_account("Bob", "bob@example.com", "bob-pw").id;
        mem.add_member(group, alice);
        mem.add_member(group, bob);

        Self {
            mem,
            expenses,
            settlements,
            balances,
            invitations,
            recurring,
            group,
            alice,
            bob,
        }
    }
}

fn materialize(
    id: ExpenseId,
    header: Expense,
    payments: Vec<NewPayment>,
    splits: Vec<NewSplit>,
) -> ExpenseWithLines {
    ExpenseWithLines {
        expense: header,
        payments: payments
            .into_iter()
            .map(|p| Payment {
                id: PaymentId::new(),
                expense_id: id,
                participant: p.participant,
                amount: p.amount,
                method: p.method,
            })
            .collect(),
        splits: splits
            .into_iter()
            .map(|s| Split {
                id: SplitId::new(),
                expense_id: id,
                participant: s.participant,
                amount: s.amount,
                split_type: s.split_type,
                share_value: s.share_value,
            })
            .collect(),
    }
}

fn build_expense(expense: NewExpense) -> ExpenseWithLines {
    let id = ExpenseId::new();
    let now = Utc::now();
    let header = Expense {
        id,
        scope: expense.scope,
        title: expense.title,
        notes: expense.notes,
        amount: expense.amount,
        currency: expense.currency,
        date: expense.date,
        category_id: expense.category_id,
        tags: expense.tags,
        created_by: expense.created_by,
        updated_by: None,
        created_at: now,
        updated_at: now,
    };
    materialize(id, header, expense.payments, expense.splits)
}

fn lines_of(expense: &ExpenseWithLines) -> impl Iterator<Item = LedgerLine> + '_ {
    let group_id = expense.expense.scope.group_id();
    expense
        .payments
        .iter()
        .map(move |p| LedgerLine {
            group_id,
            participant: p.participant,
            side: LineSide::Paid,
            amount: p.amount,
        })
        .chain(expense.splits.iter().map(move |s| LedgerLine {
            group_id,
            participant: s.participant,
            side: LineSide::Owed,
            amount: s.amount,
        }))
}

fn newest_first(rows: &mut [Expense]) {
    rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
}

fn matches_query(e: &ExpenseWithLines, q: &ExpenseQuery) -> bool {
    let h = &e.expense;
    h.scope.group_id() == Some(q.group_id)
        && q.text.as_ref().is_none_or(|t| {
            h.title.to_lowercase().contains(t)
                || h.notes.as_ref().is_some_and(|n| n.to_lowercase().contains(t))
        })
        && q.category_id.is_none_or(|c| h.category_id == Some(c))
        && q.min_amount.is_none_or(|m| h.amount >= m)
        && q.max_amount.is_none_or(|m| h.amount <= m)
        && q.date_from.is_none_or(|d| h.date >= d)
        && q.date_to.is_none_or(|d| h.date <= d)
        && q.payer.is_none_or(|p| e.payments.iter().any(|l| l.participant == p))
        && q.ower.is_none_or(|p| e.splits.iter().any(|l| l.participant == p))
        && q.created_by.is_none_or(|u| h.created_by == u)
}

#[async_trait]
impl Directory for InMemory {
    async fn group(&self, id: GroupId) -> StoreResult<Option<GroupInfo>> {
        Ok(self.with(|s| s.groups.iter().find(|g| g.id == id).cloned()))
    }

    async fn membership(&self, group: GroupId, user: UserId) -> StoreResult<Option<Membership>> {
        Ok(self.with(|s| {
            s.members
                .iter()
                .find(|m| m.group_id == group && m.user_id == user)
                .cloned()
        }))
    }

    async fn friendship(&self, pair: FriendPair) -> StoreResult<Option<FriendshipStatus>> {
        Ok(self.with(|s| {
            s.friendships
                .iter()
                .find(|(p, _)| *p == pair)
                .map(|(_, status)| *status)
        }))
    }

    async fn category(&self, id: CategoryId) -> StoreResult<Option<CategoryInfo>> {
        Ok(self.with(|s| s.categories.iter().find(|c| c.id == id).cloned()))
    }
}

#[async_trait]
impl ActivitySink for InMemory {
    async fn record(&self, entry: ActivityEntry) -> StoreResult<()> {
        if self.fail_activity.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("activity sink down".into()));
        }
        self.with(|s| s.activity.push(entry));
        Ok(())
    }
}

#[async_trait]
impl ExpenseStore for InMemory {
    async fn insert_expense(&self, expense: NewExpense) -> StoreResult<ExpenseWithLines> {
        self.check_writable()?;
        let created = build_expense(expense);
        self.with(|s| s.expenses.push(created.clone()));
        Ok(created)
    }

    async fn replace_expense(
        &self,
        id: ExpenseId,
        changes: ExpenseChanges,
    ) -> StoreResult<Option<ExpenseWithLines>> {
        self.check_writable()?;
        Ok(self.with(|s| {
            let slot = s.expenses.iter_mut().find(|e| e.expense.id == id)?;
            let mut header = slot.expense.clone();
            header.title = changes.title;
            header.notes = changes.notes;
            header.amount = changes.amount;
            header.currency = changes.currency;
            header.date = changes.date;
            header.category_id = changes.category_id;
            header.tags = changes.tags;
            header.updated_by = Some(changes.updated_by);
            header.updated_at = Utc::now();
            *slot = materialize(id, header, changes.payments, changes.splits);
            Some(slot.clone())
        }))
    }

    async fn delete_expense(&self, id: ExpenseId) -> StoreResult<bool> {
        self.check_writable()?;
        Ok(self.with(|s| {
            let before = s.expenses.len();
            s.expenses.retain(|e| e.expense.id != id);
            s.expenses.len() != before
        }))
    }

    async fn find_expense(&self, id: ExpenseId) -> StoreResult<Option<ExpenseWithLines>> {
        Ok(self.with(|s| s.expenses.iter().find(|e| e.expense.id == id).cloned()))
    }

    async fn list_group_expenses(&self, group: GroupId) -> StoreResult<Vec<Expense>> {
        let mut rows: Vec<Expense> = self.with(|s| {
            s.expenses
                .iter()
                .filter(|e| e.expense.scope.group_id() == Some(group))
                .map(|e| e.expense.clone())
                .collect()
        });
        newest_first(&mut rows);
        Ok(rows)
    }

    async fn list_friend_expenses(&self, pair: FriendPair) -> StoreResult<Vec<Expense>> {
        let mut rows: Vec<Expense> = self.with(|s| {
            s.expenses
                .iter()
                .filter(|e| {
                    matches!(e.expense.scope, crate::ledger::LedgerScope::Friend { pair: p } if p == pair)
                })
                .map(|e| e.expense.clone())
                .collect()
        });
        newest_first(&mut rows);
        Ok(rows)
    }

    async fn search_expenses(&self, query: &ExpenseQuery) -> StoreResult<(Vec<Expense>, u64)> {
        let mut rows: Vec<Expense> = self.with(|s| {
            s.expenses
                .iter()
                .filter(|e| matches_query(e, query))
                .map(|e| e.expense.clone())
                .collect()
        });
        newest_first(&mut rows);
        let total = rows.len() as u64;
        let page = rows
            .into_iter()
            .skip(usize::try_from(query.page.offset()).unwrap())
            .take(usize::try_from(query.page.limit()).unwrap())
            .collect();
        Ok((page, total))
    }

    async fn group_lines(&self, group: GroupId) -> StoreResult<Vec<LedgerLine>> {
        Ok(self.with(|s| {
            s.expenses
                .iter()
                .filter(|e| e.expense.scope.group_id() == Some(group))
                .flat_map(lines_of)
                .collect()
        }))
    }

    async fn user_lines(&self, user: UserId) -> StoreResult<Vec<LedgerLine>> {
        let participant = ParticipantRef::User(user);
        Ok(self.with(|s| {
            s.expenses
                .iter()
                .flat_map(lines_of)
                .filter(|l| l.group_id.is_some() && l.participant == participant)
                .collect()
        }))
    }
}

#[async_trait]
impl SettlementStore for InMemory {
    async fn insert_settlement(&self, settlement: NewSettlement) -> StoreResult<Settlement> {
        self.check_writable()?;
        let now = Utc::now();
        let row = Settlement {
            id: SettlementId::new(),
            scope: settlement.scope,
            payer: settlement.payer,
            payee: settlement.payee,
            amount: settlement.amount,
            currency: settlement.currency,
            status: settlement.status,
            payment_method: settlement.payment_method,
            transaction_reference: settlement.transaction_reference,
            notes: settlement.notes,
            created_by: settlement.created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        self.with(|s| s.settlements.push(row.clone()));
        Ok(row)
    }

    async fn find_settlement(&self, id: SettlementId) -> StoreResult<Option<Settlement>> {
        Ok(self.with(|s| s.settlements.iter().find(|r| r.id == id).cloned()))
    }

    async fn list_group_settlements(&self, group: GroupId) -> StoreResult<Vec<Settlement>> {
        Ok(self.with(|s| {
            s.settlements
                .iter()
                .rev()
                .filter(|r| r.scope.group_id() == Some(group))
                .cloned()
                .collect()
        }))
    }

    async fn list_friend_settlements(&self, pair: FriendPair) -> StoreResult<Vec<Settlement>> {
        Ok(self.with(|s| {
            s.settlements
                .iter()
                .rev()
                .filter(|r| {
                    matches!(r.scope, crate::ledger::LedgerScope::Friend { pair: p } if p == pair)
                })
                .cloned()
                .collect()
        }))
    }

    async fn list_user_settlements(&self, user: UserId) -> StoreResult<Vec<Settlement>> {
        let participant = ParticipantRef::User(user);
        Ok(self.with(|s| {
            s.settlements
                .iter()
                .rev()
                .filter(|r| r.involves(&participant))
                .cloned()
                .collect()
        }))
    }

    async fn update_settlement(
        &self,
        id: SettlementId,
        changes: SettlementChanges,
    ) -> StoreResult<Option<Settlement>> {
        self.check_writable()?;
        Ok(self.with(|s| {
            let row = s.settlements.iter_mut().find(|r| r.id == id)?;
            row.payer = changes.payer;
            row.payee = changes.payee;
            row.amount = changes.amount;
            row.currency = changes.currency;
            row.status = changes.status;
            row.payment_method = changes.payment_method;
            row.transaction_reference = changes.transaction_reference;
            row.notes = changes.notes;
            row.updated_by = Some(changes.updated_by);
            row.updated_at = Utc::now();
            Some(row.clone())
        }))
    }

    async fn set_settlement_status(
        &self,
        id: SettlementId,
        status: SettlementStatus,
        updated_by: UserId,
    ) -> StoreResult<Option<Settlement>> {
        self.check_writable()?;
        Ok(self.with(|s| {
            let row = s.settlements.iter_mut().find(|r| r.id == id)?;
            row.status = status;
            row.updated_by = Some(updated_by);
            row.updated_at = Utc::now();
            Some(row.clone())
        }))
    }

    async fn delete_settlement(&self, id: SettlementId) -> StoreResult<bool> {
        self.check_writable()?;
        Ok(self.with(|s| {
            let before = s.settlements.len();
            s.settlements.retain(|r| r.id != id);
            s.settlements.len() != before
        }))
    }
}

#[async_trait]
impl IdentityStore for InMemory {
    async fn upsert_pending_participant(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> StoreResult<PendingParticipant> {
        self.check_writable()?;
        Ok(self.with(|s| {
            if let Some(existing) = s.pending.iter().find(|p| p.email == email) {
                return existing.clone();
            }
            let row = PendingParticipant {
                id: PendingParticipantId::new(),
                email: email.to_string(),
                name: name.map(ToString::to_string),
                created_at: Utc::now(),
            };
            s.pending.push(row.clone());
            row
        }))
    }

    async fn find_pending_by_email(&self, email: &str) -> StoreResult<Option<PendingParticipant>> {
        Ok(self.with(|s| s.pending.iter().find(|p| p.email == email).cloned()))
    }

    async fn insert_invitation(&self, invitation: NewInvitation) -> StoreResult<Invitation> {
        self.check_writable()?;
        let row = Invitation {
            id: InvitationId::new(),
            group_id: invitation.group_id,
            email: invitation.email,
            token: invitation.token,
            role: invitation.role,
            status: InvitationStatus::Pending,
            invited_by: invitation.invited_by,
            expires_at: invitation.expires_at,
            created_at: Utc::now(),
        };
        self.with(|s| s.invitations.push(row.clone()));
        Ok(row)
    }

    async fn find_invitation_by_token(&self, token: &str) -> StoreResult<Option<Invitation>> {
        Ok(self.with(|s| s.invitations.iter().find(|i| i.token == token).cloned()))
    }

    async fn pending_invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>> {
        Ok(self.with(|s| {
            s.invitations
                .iter()
                .filter(|i| i.email == email && i.status == InvitationStatus::Pending)
                .cloned()
                .collect()
        }))
    }

    async fn mark_invitation_accepted(&self, id: InvitationId) -> StoreResult<()> {
        self.check_writable()?;
        self.with(|s| {
            if let Some(inv) = s.invitations.iter_mut().find(|i| i.id == id) {
                inv.status = InvitationStatus::Accepted;
            }
        });
        Ok(())
    }

    async fn accept_and_merge(
        &self,
        invitation: &Invitation,
        user: UserId,
    ) -> StoreResult<(Membership, MergeReport)> {
        self.check_writable()?;
        let keep_placeholder = self.keep_placeholders.load(Ordering::SeqCst);
        Ok(self.with(|s| {
            let membership = Membership {
                group_id: invitation.group_id,
                user_id: user,
                role: invitation.role,
            };
            s.members.push(membership.clone());
            if let Some(inv) = s.invitations.iter_mut().find(|i| i.id == invitation.id) {
                inv.status = InvitationStatus::Accepted;
            }

            let mut report = MergeReport::default();
            let Some(placeholder) = s.pending.iter().find(|p| p.email == invitation.email).cloned()
            else {
                return (membership, report);
            };
            let from = ParticipantRef::Pending(placeholder.id);
            let to = ParticipantRef::User(user);

            for expense in &mut s.expenses {
                for p in expense.payments.iter_mut().filter(|p| p.participant == from) {
                    p.participant = to;
                    report.payments += 1;
                }
                for sp in expense.splits.iter_mut().filter(|sp| sp.participant == from) {
                    sp.participant = to;
                    report.splits += 1;
                }
            }
            let to_self = |st: &Settlement| {
                (st.payer == from && st.payee == to) || (st.payee == from && st.payer == to)
            };
            report.self_settlements_removed =
                s.settlements.iter().filter(|&st| to_self(st)).count() as u64;
            s.settlements.retain(|st| !to_self(st));

            for settlement in &mut s.settlements {
                if settlement.payer == from {
                    settlement.payer = to;
                    report.settlement_payers += 1;
                }
                if settlement.payee == from {
                    settlement.payee = to;
                    report.settlement_payees += 1;
                }
            }

            if !keep_placeholder {
                s.pending.retain(|p| p.id != placeholder.id);
                report.placeholder_removed = true;
            }
            (membership, report)
        }))
    }
}

#[async_trait]
impl AccountGateway for InMemory {
    async fn find_account(&self, id: UserId) -> StoreResult<Option<Account>> {
        Ok(self.with(|s| s.accounts.iter().find(|(a, _)| a.id == id).map(|(a, _)| a.clone())))
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        Ok(self.with(|s| {
            s.accounts
                .iter()
                .find(|(a, _)| a.email.eq_ignore_ascii_case(email))
                .map(|(a, _)| a.clone())
        }))
    }

    async fn verify_credentials(&self, email: &str, password: &str) -> StoreResult<Option<Account>> {
        Ok(self.with(|s| {
            s.accounts
                .iter()
                .find(|(a, pw)| a.email.eq_ignore_ascii_case(email) && pw == password)
                .map(|(a, _)| a.clone())
        }))
    }

    async fn register_account(&self, name: &str, email: &str, password: &str) -> StoreResult<Account> {
        self.check_writable()?;
        Ok(self.add_account(name, email, password))
    }
}

#[async_trait]
impl RecurringStore for InMemory {
    async fn insert_template(&self, template: NewRecurringTemplate) -> StoreResult<RecurringTemplate> {
        self.check_writable()?;
        let now = Utc::now();
        let row = RecurringTemplate {
            id: RecurringExpenseId::new(),
            group_id: template.group_id,
            title: template.title,
            notes: template.notes,
            amount: template.amount,
            currency: template.currency,
            schedule: template.schedule,
            start_date: template.start_date,
            end_date: template.end_date,
            next_occurrence_date: template.start_date,
            is_active: true,
            created_by: template.created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
            payments: template.payments,
            splits: template.splits,
        };
        self.with(|s| s.templates.push(row.clone()));
        Ok(row)
    }

    async fn find_template(&self, id: RecurringExpenseId) -> StoreResult<Option<RecurringTemplate>> {
        Ok(self.template(id))
    }

    async fn list_group_templates(&self, group_id: GroupId) -> StoreResult<Vec<RecurringTemplate>> {
        Ok(self.with(|s| {
            s.templates
                .iter()
                .filter(|t| t.group_id == group_id)
                .cloned()
                .collect()
        }))
    }

    async fn update_template(
        &self,
        id: RecurringExpenseId,
        changes: RecurringChanges,
    ) -> StoreResult<Option<RecurringTemplate>> {
        self.check_writable()?;
        Ok(self.with(|s| {
            let row = s.templates.iter_mut().find(|t| t.id == id)?;
            row.title = changes.title;
            row.notes = changes.notes;
            row.amount = changes.amount;
            row.currency = changes.currency;
            row.schedule = changes.schedule;
            row.start_date = changes.start_date;
            row.end_date = changes.end_date;
            row.next_occurrence_date = changes.next_occurrence_date;
            row.is_active = changes.is_active;
            row.updated_by = Some(changes.updated_by);
            row.updated_at = Utc::now();
            row.payments = changes.payments;
            row.splits = changes.splits;
            Some(row.clone())
        }))
    }

    async fn set_active(
        &self,
        id: RecurringExpenseId,
        is_active: bool,
        updated_by: UserId,
    ) -> StoreResult<Option<RecurringTemplate>> {
        self.check_writable()?;
        Ok(self.with(|s| {
            let row = s.templates.iter_mut().find(|t| t.id == id)?;
            row.is_active = is_active;
            row.updated_by = Some(updated_by);
            Some(row.clone())
        }))
    }

    async fn delete_template(&self, id: RecurringExpenseId) -> StoreResult<bool> {
        self.check_writable()?;
        Ok(self.with(|s| {
            let before = s.templates.len();
            s.templates.retain(|t| t.id != id);
            s.templates.len() != before
        }))
    }

    async fn due_templates(&self, today: NaiveDate) -> StoreResult<Vec<RecurringTemplate>> {
        let mut due: Vec<RecurringTemplate> = self.with(|s| {
            s.templates
                .iter()
                .filter(|t| t.is_due(today))
                .cloned()
                .collect()
        });
        due.sort_by_key(|t| t.next_occurrence_date);
        Ok(due)
    }

    async fn commit_occurrence(&self, commit: OccurrenceCommit) -> StoreResult<ExpenseWithLines> {
        self.check_writable()?;
        self.with(|s| {
            let template = s
                .templates
                .iter_mut()
                .find(|t| t.id == commit.template_id)
                .ok_or_else(|| StoreError::Missing(commit.template_id.to_string()))?;
            if template.next_occurrence_date != commit.expected_next {
                return Err(StoreError::Conflict(format!(
                    "recurring expense {} already advanced",
                    commit.template_id
                )));
            }
            template.next_occurrence_date = commit.next_occurrence_date;
            template.is_active = commit.is_active;

            let created = build_expense(commit.expense);
            s.expenses.push(created.clone());
            Ok(created)
        })
    }
}
