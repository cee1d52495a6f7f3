mod create;
mod drafts;
mod guarded;
